//! # mandate - In-process command and query dispatch
//!
//! Application code hands a request to a [`Dispatcher`] without knowing who
//! handles it. Commands fan out to every registered handler; queries resolve
//! to exactly one. Both travel through ordered chains of behaviors that can
//! observe, short-circuit or retry the rest of the chain.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mandate::prelude::*;
//!
//! #[derive(Debug, Command)]
//! struct PlaceOrder { sku: String }
//!
//! struct Fulfilment;
//!
//! impl CommandHandler<PlaceOrder> for Fulfilment {
//!     async fn handle(&self, order: &PlaceOrder, _cancel: &CancellationToken) -> Result<(), BoxError> {
//!         println!("shipping {}", order.sku);
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::builder()
//!     .command_handler::<PlaceOrder, _>(Fulfilment)
//!     .command_behavior::<PlaceOrder, _>(LoggingBehavior::new())
//!     .build();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let outcome = dispatcher.publish(PlaceOrder { sku: "A-1".into() }).wait().await;
//! assert!(outcome.is_completed());
//! ```
//!
//! ## Crates
//!
//! - `mandate-core`: request taxonomy, contracts, pipeline composer, errors
//! - `mandate-std`: registry, dispatcher, selectors, standard behaviors
//! - `mandate-macros`: `#[derive(Command)]` and `#[derive(Query)]` (feature `macros`)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use mandate_core::{
    // Behaviors
    Bound,
    // Errors
    BoxError,
    BoxFuture,
    // Cancellation
    CancellationToken,
    // Context
    Candidate,
    Cancelled,
    // Requests
    Command,
    CommandBehavior,
    CommandCandidate,
    // Handlers
    CommandHandler,
    CommandHandlerBehavior,
    CommandKind,
    ContextFactory,
    DispatchError,
    DynCommandBehavior,
    DynCommandHandler,
    DynCommandHandlerBehavior,
    DynQueryBehavior,
    DynQueryHandler,
    DynQueryHandlerBehavior,
    EveryHandler,
    ForHandler,
    HandlerMismatch,
    // Pipeline
    Layer,
    Next,
    Pipeline,
    Query,
    QueryBehavior,
    QueryCandidate,
    QueryHandler,
    QueryHandlerBehavior,
    // Selection
    QueryHandlerSelector,
    QueryKind,
    Request,
    RequestKind,
    ResolutionContext,
    compose,
    is_cancellation,
    select_query_handler,
};

pub use mandate_std::{
    DefaultFirstSelector, DefaultHandlerSelector, Dispatcher, DispatcherBuilder, FailureCallback,
    Lifetime, PublishHandle, PublishOptions, PublishOutcome, Registry, RegistrationMeta,
    RegistryBuilder, Scope, behaviors, meta, testing,
};

#[cfg(feature = "macros")]
pub use mandate_macros::{Command, Query};

/// The commonly used items.
pub mod prelude {
    pub use crate::{
        BoxError, CancellationToken, Command, CommandBehavior, CommandHandler,
        CommandHandlerBehavior, DispatchError, Dispatcher, Next, PublishOptions, PublishOutcome,
        Query, QueryBehavior, QueryHandler, QueryHandlerBehavior, QueryHandlerSelector, Registry,
        Request,
        behaviors::{LoggingBehavior, TimeoutBehavior, When},
    };
}
