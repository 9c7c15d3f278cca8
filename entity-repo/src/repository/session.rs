//! Sessions: one pooled connection, one transaction at a time
//!
//! A [`Session`] is the handle a repository executes through. The first
//! operation begins a transaction on a pooled connection; every later
//! operation reuses it, so reads see the session's own staged writes.
//! [`UnitOfWork::save_changes`] commits it; closing or dropping the session
//! rolls it back and returns the connection to the pool.
//!
//! Transactions begin `IMMEDIATE`: an open unit of work holds the store's
//! write lock, and other sessions wait on it for up to the configured busy
//! timeout.

use std::future::Future;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;

use super::base::Repository;
use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::traits::{Entity, RepositoryResult, UnitOfWork};

/// Exclusive handle on the store for one unit of work
pub struct Session {
    id: Uuid,
    pool: SqlitePool,
    transaction: Option<Transaction<'static, Sqlite>>,
    pending: u64,
    closed: bool,
}

impl Session {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        let id = Uuid::now_v7();
        debug!(session = %id, "session opened");
        Self {
            id,
            pool,
            transaction: None,
            pending: 0,
            closed: false,
        }
    }

    /// Identifier used to correlate log lines
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether [`Session::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// A repository for `T` that borrows this session
    ///
    /// Several repositories can take turns on one session and share its
    /// unit of work.
    pub fn repository<T: Entity>(&mut self) -> Repository<'_, T> {
        Repository::borrowed(self)
    }

    /// Release the connection, rolling back anything not yet committed
    ///
    /// Idempotent. Every later operation fails with a `Disposed` error.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.rollback("session closed");
        self.closed = true;
        debug!(session = %self.id, "session closed");
    }

    pub(crate) fn ensure_open(&self, operation: RepositoryOperation) -> RepositoryResult<()> {
        if self.closed {
            Err(RepositoryError::disposed(operation))
        } else {
            Ok(())
        }
    }

    /// The transaction's connection, beginning the transaction if needed
    pub(crate) async fn connection(
        &mut self,
        operation: RepositoryOperation,
    ) -> RepositoryResult<&mut SqliteConnection> {
        self.ensure_open(operation)?;
        let transaction = match self.transaction.take() {
            Some(transaction) => transaction,
            None => {
                // Take the write lock up front so a read followed by a write
                // never has to upgrade a stale snapshot.
                let transaction = self
                    .pool
                    .begin_with("BEGIN IMMEDIATE")
                    .await
                    .map_err(|e| {
                        RepositoryError::from(DatabaseError::from(e)).with_operation(operation)
                    })?;
                debug!(session = %self.id, "transaction started");
                transaction
            }
        };
        Ok(&mut **self.transaction.insert(transaction))
    }

    pub(crate) fn record_changes(&mut self, rows: u64) {
        self.pending = self.pending.saturating_add(rows);
    }

    /// Drop the open transaction; sqlx rolls it back when it is dropped
    pub(crate) fn rollback(&mut self, reason: &str) {
        if let Some(transaction) = self.transaction.take() {
            let discarded = std::mem::take(&mut self.pending);
            if discarded > 0 {
                warn!(session = %self.id, discarded, reason, "rolling back uncommitted changes");
            } else {
                debug!(session = %self.id, reason, "transaction released");
            }
            drop(transaction);
        }
    }

    async fn commit(&mut self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::SaveChanges;
        self.ensure_open(operation)?;
        if cancel.is_cancelled() {
            self.rollback("save_changes cancelled");
            return Err(RepositoryError::cancelled(operation));
        }
        let Some(transaction) = self.transaction.take() else {
            return Ok(0);
        };
        let written = std::mem::take(&mut self.pending);
        // Once issued the commit runs to completion; it is not raced against `cancel`.
        transaction.commit().await.map_err(|e| {
            RepositoryError::from(DatabaseError::from(e)).with_operation(operation)
        })?;
        info!(session = %self.id, written, "unit of work committed");
        Ok(written)
    }
}

impl UnitOfWork for Session {
    async fn save_changes(&mut self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        self.commit(cancel).await
    }

    fn pending_changes(&self) -> u64 {
        self.pending
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.rollback("session dropped");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("in_transaction", &self.transaction.is_some())
            .field("pending", &self.pending)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Race `work` against `cancel`, preferring cancellation
pub(crate) async fn guard<T, F>(
    cancel: &CancellationToken,
    operation: RepositoryOperation,
    work: F,
) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(RepositoryError::cancelled(operation));
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RepositoryError::cancelled(operation)),
        result = work => result,
    }
}

/// A cancelled operation leaves nothing staged behind
pub(crate) fn settle<T>(session: &mut Session, outcome: RepositoryResult<T>) -> RepositoryResult<T> {
    if let Err(err) = &outcome {
        if err.kind == RepositoryErrorKind::Cancelled {
            session.rollback("operation cancelled");
        }
    }
    outcome
}
