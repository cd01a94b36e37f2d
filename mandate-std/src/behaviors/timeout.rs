//! Time limit for the rest of a chain.

use mandate_core::{
    BoxError, CancellationToken, Command, CommandBehavior, Next, Query, QueryBehavior,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// The chain did not finish within the allotted time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("request did not complete within {limit:?}")]
pub struct Elapsed {
    /// The time limit that was exceeded.
    pub limit: Duration,
}

/// Fails the dispatch with [`Elapsed`] when the inner chain takes longer
/// than `limit`. The inner chain is dropped at that point.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutBehavior {
    limit: Duration,
    order: Option<i32>,
}

impl TimeoutBehavior {
    /// Limit the inner chain to `limit`.
    pub fn new(limit: Duration) -> Self {
        Self { limit, order: None }
    }

    /// Set the precedence key.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    async fn guard<R, T>(&self, next: Next<'_, R, T>) -> Result<T, BoxError> {
        match timeout(self.limit, next.run()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(limit = ?self.limit, "request timed out");
                Err(Box::new(Elapsed { limit: self.limit }))
            }
        }
    }
}

impl<C: Command> CommandBehavior<C> for TimeoutBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _command: &C,
        next: Next<'_, C, ()>,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.guard(next).await
    }
}

impl<Q: Query> QueryBehavior<Q> for TimeoutBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _query: &Q,
        next: Next<'_, Q, Q::Response>,
        _cancel: &CancellationToken,
    ) -> Result<Q::Response, BoxError> {
        self.guard(next).await
    }
}
