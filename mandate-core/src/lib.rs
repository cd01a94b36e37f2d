//! # mandate-core
//!
//! Core traits for the Mandate command/query dispatch engine.
//!
//! This crate has minimal dependencies and is meant to be imported by code that
//! only authors handlers, behaviors or selectors, without pulling in the
//! registry and dispatcher from `mandate-std`.
//!
//! # Building blocks
//!
//! ## Requests ([`Command`], [`Query`])
//!
//! Two disjoint request kinds. Commands mutate state and return nothing; a
//! query produces exactly one typed response.
//!
//! ## Handlers ([`CommandHandler`], [`QueryHandler`])
//!
//! The terminal point of a dispatch. A command may have any number of
//! handlers, all of which run; a query runs exactly one.
//!
//! ## Behaviors ([`CommandBehavior`], [`CommandHandlerBehavior`], [`QueryBehavior`], [`QueryHandlerBehavior`])
//!
//! Ordered, conditionally-skippable interceptors wrapping a request or one
//! specific handler.
//!
//! ## Selection ([`QueryHandlerSelector`])
//!
//! Resolves which single handler answers a query when several are registered.
//!
//! ## Composition ([`compose`], [`Pipeline`], [`Next`])
//!
//! The ordering and chaining algorithm shared by all behavior shapes.
//!
//! ## Resolution ([`ResolutionContext`], [`ContextFactory`])
//!
//! The narrow interface through which a dispatcher obtains candidates.
//!
//! # Error Types
//!
//! - [`DispatchError`] - resolution and execution failures
//! - [`Cancelled`] - cooperative cancellation
//! - [`BoxError`] - opaque handler and behavior errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod behavior;
mod cancel;
mod context;
mod error;
mod handler;
mod pipeline;
mod request;
mod selector;

// Re-exports
pub use behavior::{
    Bound, CommandBehavior, CommandHandlerBehavior, DynCommandBehavior,
    DynCommandHandlerBehavior, DynQueryBehavior, DynQueryHandlerBehavior, EveryHandler, ForHandler,
    HandlerMismatch, QueryBehavior, QueryHandlerBehavior,
};
pub use cancel::{CancellationToken, Cancelled};
pub use context::{Candidate, CommandCandidate, ContextFactory, QueryCandidate, ResolutionContext};
pub use error::{BoxError, DispatchError, is_cancellation};
pub use handler::{CommandHandler, DynCommandHandler, DynQueryHandler, QueryHandler};
pub use pipeline::{Layer, Next, Pipeline, compose};
pub use request::{Command, CommandKind, Query, QueryKind, Request, RequestKind};
pub use selector::{QueryHandlerSelector, select_query_handler};

/// Re-exported so behavior and handler authors can name boxed futures.
pub use futures::future::BoxFuture;
