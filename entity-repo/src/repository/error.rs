//! Repository error types
//!
//! This module provides structured error types for repository operations,
//! allowing fine-grained error handling and meaningful error messages.
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::{RepositoryError, RepositoryOperation, RepositoryErrorKind};
//!
//! let error = RepositoryError::invalid_argument(RepositoryOperation::Get, "skip must be -1 or >= 0");
//! assert!(matches!(error.kind, RepositoryErrorKind::InvalidArgument));
//! assert!(!error.is_retriable());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Creating a new entity
    Create,
    /// Creating a batch of entities
    CreateRange,
    /// Updating an existing entity
    Update,
    /// Updating a batch of entities
    UpdateRange,
    /// Finding the first entity matching a query
    Find,
    /// Listing entities matching a query
    Get,
    /// Listing projected entities with a total count
    GetProjected,
    /// Counting entities matching a filter
    Count,
    /// Building or running a composable query
    Query,
    /// Running caller-supplied SQL
    RawQuery,
    /// Loading related entities for an include
    LoadRelation,
    /// Committing the unit of work
    SaveChanges,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::CreateRange => write!(f, "create_range"),
            Self::Update => write!(f, "update"),
            Self::UpdateRange => write!(f, "update_range"),
            Self::Find => write!(f, "find"),
            Self::Get => write!(f, "get"),
            Self::GetProjected => write!(f, "get_projected"),
            Self::Count => write!(f, "count"),
            Self::Query => write!(f, "query"),
            Self::RawQuery => write!(f, "raw_query"),
            Self::LoadRelation => write!(f, "load_relation"),
            Self::SaveChanges => write!(f, "save_changes"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// Database constraint violation
    ConstraintViolation,
    /// Caller supplied an argument the repository cannot act on
    InvalidArgument,
    /// Failed to connect to database
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// Row decoding or value conversion failed
    SerializationError,
    /// Operation was cancelled by the caller
    Cancelled,
    /// Repository handle was already released
    Disposed,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

/// Structured repository error with operation context
///
/// Provides detailed information about what operation failed, why it failed,
/// and which entity was involved.
///
/// # Example
///
/// ```rust
/// use entity_repo::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::disposed(RepositoryOperation::Get).with_entity_type("User");
/// assert_eq!(
///     error.to_string(),
///     "Repository disposed error during get: Repository handle already released [User]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "User", "Order")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Find,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidArgument, message)
    }

    /// Create a cancellation error
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation cancelled before completion",
        )
    }

    /// Create a use-after-dispose error
    pub fn disposed(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Disposed,
            "Repository handle already released",
        )
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add the entity type without an identifier
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// The repository never retries on its own; this is advice for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }

    /// Whether the error originated in the backing store
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConstraintViolation
                | RepositoryErrorKind::ConnectionFailed
                | RepositoryErrorKind::Timeout
                | RepositoryErrorKind::DatabaseError
                | RepositoryErrorKind::SerializationError
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::Create), "create");
        assert_eq!(format!("{}", RepositoryOperation::CreateRange), "create_range");
        assert_eq!(format!("{}", RepositoryOperation::UpdateRange), "update_range");
        assert_eq!(format!("{}", RepositoryOperation::GetProjected), "get_projected");
        assert_eq!(format!("{}", RepositoryOperation::RawQuery), "raw_query");
        assert_eq!(format!("{}", RepositoryOperation::SaveChanges), "save_changes");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(format!("{}", RepositoryErrorKind::NotFound), "not_found");
        assert_eq!(
            format!("{}", RepositoryErrorKind::InvalidArgument),
            "invalid_argument"
        );
        assert_eq!(format!("{}", RepositoryErrorKind::Cancelled), "cancelled");
        assert_eq!(format!("{}", RepositoryErrorKind::Disposed), "disposed");
    }

    #[test]
    fn test_not_found_convenience() {
        let error = RepositoryError::not_found("User", "42");
        assert_eq!(error.operation, RepositoryOperation::Find);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type, Some("User".to_string()));
        assert_eq!(error.entity_id, Some("42".to_string()));
    }

    #[test]
    fn test_lifecycle_errors() {
        let cancelled = RepositoryError::cancelled(RepositoryOperation::SaveChanges);
        assert_eq!(cancelled.kind, RepositoryErrorKind::Cancelled);
        assert!(!cancelled.is_storage_error());

        let disposed = RepositoryError::disposed(RepositoryOperation::Count);
        assert_eq!(disposed.kind, RepositoryErrorKind::Disposed);
        assert_eq!(disposed.operation, RepositoryOperation::Count);
    }

    #[test]
    fn test_with_operation() {
        let error = RepositoryError::database_error(RepositoryOperation::Query, "syntax error")
            .with_operation(RepositoryOperation::RawQuery);
        assert_eq!(error.operation, RepositoryOperation::RawQuery);
        assert!(error.is_storage_error());
    }

    #[test]
    fn test_is_retriable() {
        let transient = RepositoryError::new(
            RepositoryOperation::Get,
            RepositoryErrorKind::Timeout,
            "database is locked",
        );
        assert!(transient.is_retriable());
        assert!(
            !RepositoryError::constraint_violation(RepositoryOperation::Create, "UNIQUE")
                .is_retriable()
        );
        assert!(
            !RepositoryError::invalid_argument(RepositoryOperation::Update, "missing key")
                .is_retriable()
        );
    }

    #[test]
    fn test_display_variants() {
        let plain = RepositoryError::database_error(RepositoryOperation::Create, "Query failed");
        let display = plain.to_string();
        assert!(display.contains("database_error"));
        assert!(display.contains("create"));
        assert!(!display.contains('['));

        let with_id = RepositoryError::not_found("User", "usr_123");
        assert!(with_id.to_string().ends_with("[User: usr_123]"));
    }

    #[test]
    fn test_error_is_error_trait() {
        let error: Box<dyn std::error::Error> = Box::new(RepositoryError::not_found("User", "123"));
        assert!(error.to_string().contains("not_found"));
    }
}
