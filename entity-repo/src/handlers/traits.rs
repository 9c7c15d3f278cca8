//! Handler trait definitions for the command/query boundary
//!
//! Uses RPITIT (Return Position Impl Trait In Traits), available since Rust
//! 1.75, so handlers are plain `async fn`s without `async_trait`.
//!
//! - [`CommandHandler`]: a request that changes state
//! - [`QueryHandler`]: a request that only reads
//!
//! Each request type maps to exactly one handler and one output type.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Handles one command type
///
/// # Example
///
/// ```rust,ignore
/// impl CommandHandler<CreateUserCommand> for CreateUserHandler {
///     type Output = UserResponse;
///
///     async fn handle(&self, command: CreateUserCommand, cancel: &CancellationToken) -> Result<UserResponse> {
///         // create, save_changes, map
///     }
/// }
/// ```
pub trait CommandHandler<C>: Send + Sync {
    /// Response produced once the command has been committed
    type Output;

    /// Run the command as one unit of work
    fn handle(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Self::Output>> + Send;
}

/// Handles one query type
pub trait QueryHandler<Q>: Send + Sync {
    /// Response produced for the query
    type Output;

    /// Answer the query without staging any mutation
    fn handle(
        &self,
        query: Q,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Self::Output>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Echo;

    struct Shout(String);

    impl CommandHandler<Shout> for Echo {
        type Output = String;

        async fn handle(&self, command: Shout, cancel: &CancellationToken) -> Result<String> {
            if cancel.is_cancelled() {
                return Err(Error::Internal("cancelled".to_string()));
            }
            Ok(command.0.to_uppercase())
        }
    }

    impl QueryHandler<usize> for Echo {
        type Output = Vec<u8>;

        async fn handle(&self, query: usize, _cancel: &CancellationToken) -> Result<Vec<u8>> {
            Ok(vec![0; query])
        }
    }

    #[tokio::test]
    async fn test_command_handler() {
        let cancel = CancellationToken::new();
        let out = CommandHandler::handle(&Echo, Shout("hi".to_string()), &cancel)
            .await
            .unwrap();
        assert_eq!(out, "HI");

        cancel.cancel();
        assert!(CommandHandler::handle(&Echo, Shout("hi".to_string()), &cancel)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_query_handler() {
        let cancel = CancellationToken::new();
        let out = QueryHandler::handle(&Echo, 3, &cancel).await.unwrap();
        assert_eq!(out.len(), 3);
    }
}
