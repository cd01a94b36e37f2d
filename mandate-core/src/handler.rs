//! Handler contracts.
//!
//! A [`CommandHandler`] performs the action a command asks for; a
//! [`QueryHandler`] produces the response of one query type. Zero, one or many
//! handlers may be registered per request type.
//!
//! The static traits use `impl Future` returns. The registry stores handlers
//! as [`DynCommandHandler`] / [`DynQueryHandler`] trait objects, which every
//! static handler implements through a blanket impl.

use crate::{
    cancel::CancellationToken,
    error::BoxError,
    request::{Command, Query},
};
use futures::future::BoxFuture;
use std::{any::Any, future::Future};

/// Executes one command type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle command `{C}`",
    label = "missing `CommandHandler<{C}>` implementation",
    note = "Command handlers must implement `handle` for the command type `{C}`."
)]
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    /// Perform the command.
    fn handle(
        &self,
        command: &C,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Produces the response for one query type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle query `{Q}`",
    label = "missing `QueryHandler<{Q}>` implementation",
    note = "Query handlers must implement `handle` for the query type `{Q}`."
)]
pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    /// Produce the response.
    fn handle(
        &self,
        query: &Q,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Q::Response, BoxError>> + Send;
}

/// Object-safe version of [`CommandHandler`].
pub trait DynCommandHandler<C: Command>: Send + Sync + 'static {
    /// Perform the command (dynamic dispatch version).
    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>>;

    /// The concrete handler, for handler-level behaviors.
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<C: Command, T: CommandHandler<C>> DynCommandHandler<C> for T {
    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.handle(command, cancel))
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// Object-safe version of [`QueryHandler`].
pub trait DynQueryHandler<Q: Query>: Send + Sync + 'static {
    /// Produce the response (dynamic dispatch version).
    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>>;

    /// The concrete handler, for handler-level behaviors.
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<Q: Query, T: QueryHandler<Q>> DynQueryHandler<Q> for T {
    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        Box::pin(self.handle(query, cancel))
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
