//! # Behaviors
//!
//! Behaviors are ordered, conditionally-skippable interceptors. There are four
//! shapes:
//!
//! | Shape                   | Trait                          | Wraps                          |
//! |-------------------------|--------------------------------|--------------------------------|
//! | command, request level  | [`CommandBehavior`]            | the fan-out over all handlers  |
//! | command, handler level  | [`CommandHandlerBehavior`]     | one command handler            |
//! | query, request level    | [`QueryBehavior`]              | the selected handler's chain   |
//! | query, handler level    | [`QueryHandlerBehavior`]       | the selected query handler     |
//!
//! Every shape has an optional `order` (smaller runs closer to the caller), a
//! `should_run` predicate evaluated once per dispatch, and a `handle` method
//! receiving a [`Next`] continuation.
//!
//! The registry stores behaviors as the object-safe `Dyn*` traits. Request-level
//! behaviors get them through blanket impls; handler-level behaviors are wrapped
//! in [`ForHandler`], which recovers the concrete handler type at dispatch time.

use crate::{
    cancel::CancellationToken,
    error::BoxError,
    handler::{CommandHandler, QueryHandler},
    pipeline::{Layer, Next},
    request::{Command, Query},
};
use futures::future::BoxFuture;
use std::{
    any::{Any, type_name},
    future::Future,
    marker::PhantomData,
};
use thiserror::Error;

/// Raised when a handler-level behavior is bound to a handler of another type.
#[derive(Error, Debug, Clone, Copy)]
#[error("handler-level behavior expected handler type {expected}")]
pub struct HandlerMismatch {
    /// The handler type the behavior was registered for.
    pub expected: &'static str,
}

// ============================================================================
// Request-level shapes
// ============================================================================

/// Intercepts a command before it is fanned out to its handlers.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a command behavior for `{C}`",
    label = "missing `CommandBehavior<{C}>` implementation"
)]
pub trait CommandBehavior<C: Command>: Send + Sync + 'static {
    /// Precedence key. Smaller values run closer to the caller.
    fn order(&self) -> Option<i32> {
        None
    }

    /// Whether this behavior participates in the dispatch of `command`.
    fn should_run(&self, command: &C) -> bool {
        let _ = command;
        true
    }

    /// Run around the rest of the chain.
    fn handle(
        &self,
        command: &C,
        next: Next<'_, C, ()>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Intercepts a query before its selected handler's chain.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a query behavior for `{Q}`",
    label = "missing `QueryBehavior<{Q}>` implementation"
)]
pub trait QueryBehavior<Q: Query>: Send + Sync + 'static {
    /// Precedence key. Smaller values run closer to the caller.
    fn order(&self) -> Option<i32> {
        None
    }

    /// Whether this behavior participates in the dispatch of `query`.
    fn should_run(&self, query: &Q) -> bool {
        let _ = query;
        true
    }

    /// Run around the rest of the chain.
    fn handle(
        &self,
        query: &Q,
        next: Next<'_, Q, Q::Response>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Q::Response, BoxError>> + Send;
}

/// Object-safe version of [`CommandBehavior`].
pub trait DynCommandBehavior<C: Command>: Send + Sync + 'static {
    /// See [`CommandBehavior::order`].
    fn order_dyn(&self) -> Option<i32>;

    /// See [`CommandBehavior::should_run`].
    fn should_run_dyn(&self, command: &C) -> bool;

    /// See [`CommandBehavior::handle`].
    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

impl<C: Command, B: CommandBehavior<C>> DynCommandBehavior<C> for B {
    fn order_dyn(&self) -> Option<i32> {
        self.order()
    }

    fn should_run_dyn(&self, command: &C) -> bool {
        self.should_run(command)
    }

    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.handle(command, next, cancel))
    }
}

/// Object-safe version of [`QueryBehavior`].
pub trait DynQueryBehavior<Q: Query>: Send + Sync + 'static {
    /// See [`QueryBehavior::order`].
    fn order_dyn(&self) -> Option<i32>;

    /// See [`QueryBehavior::should_run`].
    fn should_run_dyn(&self, query: &Q) -> bool;

    /// See [`QueryBehavior::handle`].
    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>>;
}

impl<Q: Query, B: QueryBehavior<Q>> DynQueryBehavior<Q> for B {
    fn order_dyn(&self) -> Option<i32> {
        self.order()
    }

    fn should_run_dyn(&self, query: &Q) -> bool {
        self.should_run(query)
    }

    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        Box::pin(self.handle(query, next, cancel))
    }
}

// ============================================================================
// Handler-level shapes
// ============================================================================

/// Intercepts one command handler of concrete type `H`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a command handler behavior for `{H}` handling `{C}`",
    label = "missing `CommandHandlerBehavior<{C}, {H}>` implementation"
)]
pub trait CommandHandlerBehavior<C: Command, H: CommandHandler<C>>: Send + Sync + 'static {
    /// Precedence key. Smaller values run closer to the caller.
    fn order(&self) -> Option<i32> {
        None
    }

    /// Whether this behavior participates in the dispatch of `command`.
    fn should_run(&self, command: &C) -> bool {
        let _ = command;
        true
    }

    /// Run around the rest of the handler's chain.
    fn handle(
        &self,
        command: &C,
        handler: &H,
        next: Next<'_, C, ()>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Intercepts the selected query handler of concrete type `H`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a query handler behavior for `{H}` handling `{Q}`",
    label = "missing `QueryHandlerBehavior<{Q}, {H}>` implementation"
)]
pub trait QueryHandlerBehavior<Q: Query, H: QueryHandler<Q>>: Send + Sync + 'static {
    /// Precedence key. Smaller values run closer to the caller.
    fn order(&self) -> Option<i32> {
        None
    }

    /// Whether this behavior participates in the dispatch of `query`.
    fn should_run(&self, query: &Q) -> bool {
        let _ = query;
        true
    }

    /// Run around the rest of the handler's chain.
    fn handle(
        &self,
        query: &Q,
        handler: &H,
        next: Next<'_, Q, Q::Response>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Q::Response, BoxError>> + Send;
}

/// Object-safe version of [`CommandHandlerBehavior`] with the handler type erased.
pub trait DynCommandHandlerBehavior<C: Command>: Send + Sync + 'static {
    /// See [`CommandHandlerBehavior::order`].
    fn order_dyn(&self) -> Option<i32>;

    /// See [`CommandHandlerBehavior::should_run`].
    fn should_run_dyn(&self, command: &C) -> bool;

    /// See [`CommandHandlerBehavior::handle`]. `handler` must be the concrete
    /// handler this behavior was registered for.
    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Object-safe version of [`QueryHandlerBehavior`] with the handler type erased.
pub trait DynQueryHandlerBehavior<Q: Query>: Send + Sync + 'static {
    /// See [`QueryHandlerBehavior::order`].
    fn order_dyn(&self) -> Option<i32>;

    /// See [`QueryHandlerBehavior::should_run`].
    fn should_run_dyn(&self, query: &Q) -> bool;

    /// See [`QueryHandlerBehavior::handle`]. `handler` must be the concrete
    /// handler this behavior was registered for.
    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>>;
}

/// Binds a handler-level behavior to the handler type `H` it intercepts.
pub struct ForHandler<B, H> {
    behavior: B,
    _handler: PhantomData<fn() -> H>,
}

impl<B, H> ForHandler<B, H> {
    /// Bind `behavior` to handlers of type `H`.
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            _handler: PhantomData,
        }
    }

    /// The wrapped behavior.
    pub fn inner(&self) -> &B {
        &self.behavior
    }
}

impl<C, H, B> DynCommandHandlerBehavior<C> for ForHandler<B, H>
where
    C: Command,
    H: CommandHandler<C>,
    B: CommandHandlerBehavior<C, H>,
{
    fn order_dyn(&self) -> Option<i32> {
        self.behavior.order()
    }

    fn should_run_dyn(&self, command: &C) -> bool {
        self.behavior.should_run(command)
    }

    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        let Some(handler) = handler.downcast_ref::<H>() else {
            let mismatch = HandlerMismatch {
                expected: type_name::<H>(),
            };
            return Box::pin(async move { Err::<(), BoxError>(Box::new(mismatch)) });
        };
        Box::pin(self.behavior.handle(command, handler, next, cancel))
    }
}

impl<Q, H, B> DynQueryHandlerBehavior<Q> for ForHandler<B, H>
where
    Q: Query,
    H: QueryHandler<Q>,
    B: QueryHandlerBehavior<Q, H>,
{
    fn order_dyn(&self) -> Option<i32> {
        self.behavior.order()
    }

    fn should_run_dyn(&self, query: &Q) -> bool {
        self.behavior.should_run(query)
    }

    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        let Some(handler) = handler.downcast_ref::<H>() else {
            let mismatch = HandlerMismatch {
                expected: type_name::<H>(),
            };
            return Box::pin(async move { Err::<Q::Response, BoxError>(Box::new(mismatch)) });
        };
        Box::pin(self.behavior.handle(query, handler, next, cancel))
    }
}

/// Runs a request-level behavior around each handler individually.
///
/// The behavior never sees the handler, so one registration covers every
/// handler type of the request.
pub struct EveryHandler<B> {
    behavior: B,
}

impl<B> EveryHandler<B> {
    /// Apply `behavior` to each handler.
    pub fn new(behavior: B) -> Self {
        Self { behavior }
    }

    /// The wrapped behavior.
    pub fn inner(&self) -> &B {
        &self.behavior
    }
}

impl<C, B> DynCommandHandlerBehavior<C> for EveryHandler<B>
where
    C: Command,
    B: CommandBehavior<C>,
{
    fn order_dyn(&self) -> Option<i32> {
        self.behavior.order()
    }

    fn should_run_dyn(&self, command: &C) -> bool {
        self.behavior.should_run(command)
    }

    fn handle_dyn<'a>(
        &'a self,
        command: &'a C,
        _handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.behavior.handle(command, next, cancel))
    }
}

impl<Q, B> DynQueryHandlerBehavior<Q> for EveryHandler<B>
where
    Q: Query,
    B: QueryBehavior<Q>,
{
    fn order_dyn(&self) -> Option<i32> {
        self.behavior.order()
    }

    fn should_run_dyn(&self, query: &Q) -> bool {
        self.behavior.should_run(query)
    }

    fn handle_dyn<'a>(
        &'a self,
        query: &'a Q,
        _handler: &'a (dyn Any + Send + Sync),
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        Box::pin(self.behavior.handle(query, next, cancel))
    }
}

// ============================================================================
// Composition layers
// ============================================================================

impl<'a, C: Command> Layer<'a, C, ()> for &'a (dyn DynCommandBehavior<C> + 'static) {
    fn order(&self) -> Option<i32> {
        self.order_dyn()
    }

    fn should_run(&self, request: &C) -> bool {
        self.should_run_dyn(request)
    }

    fn call(
        self,
        request: &'a C,
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        self.handle_dyn(request, next, cancel)
    }
}

impl<'a, Q: Query> Layer<'a, Q, Q::Response> for &'a (dyn DynQueryBehavior<Q> + 'static) {
    fn order(&self) -> Option<i32> {
        self.order_dyn()
    }

    fn should_run(&self, request: &Q) -> bool {
        self.should_run_dyn(request)
    }

    fn call(
        self,
        request: &'a Q,
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        self.handle_dyn(request, next, cancel)
    }
}

/// A handler-level behavior paired with the handler instance it wraps.
pub struct Bound<'a, B: ?Sized> {
    behavior: &'a B,
    handler: &'a (dyn Any + Send + Sync),
}

impl<'a, B: ?Sized> Bound<'a, B> {
    /// Pair `behavior` with `handler`.
    pub fn new(behavior: &'a B, handler: &'a (dyn Any + Send + Sync)) -> Self {
        Self { behavior, handler }
    }
}

impl<B: ?Sized> Clone for Bound<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for Bound<'_, B> {}

impl<'a, C: Command> Layer<'a, C, ()> for Bound<'a, dyn DynCommandHandlerBehavior<C>> {
    fn order(&self) -> Option<i32> {
        self.behavior.order_dyn()
    }

    fn should_run(&self, request: &C) -> bool {
        self.behavior.should_run_dyn(request)
    }

    fn call(
        self,
        request: &'a C,
        next: Next<'a, C, ()>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        self.behavior.handle_dyn(request, self.handler, next, cancel)
    }
}

impl<'a, Q: Query> Layer<'a, Q, Q::Response> for Bound<'a, dyn DynQueryHandlerBehavior<Q>> {
    fn order(&self) -> Option<i32> {
        self.behavior.order_dyn()
    }

    fn should_run(&self, request: &Q) -> bool {
        self.behavior.should_run_dyn(request)
    }

    fn call(
        self,
        request: &'a Q,
        next: Next<'a, Q, Q::Response>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Q::Response, BoxError>> {
        self.behavior.handle_dyn(request, self.handler, next, cancel)
    }
}
