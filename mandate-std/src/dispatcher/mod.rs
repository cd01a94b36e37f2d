//! The dispatcher: entry point for publishing commands and sending queries.
//!
//! Every dispatch opens a fresh resolution context from the dispatcher's
//! [`ContextFactory`], resolves its participants, composes the behavior
//! chains and runs them. Nothing is cached between dispatches.
//!
//! - [`Dispatcher::publish`] is fire-and-forget: the work runs on a spawned
//!   task, every command handler runs concurrently, and failures go to a
//!   callback instead of the caller.
//! - [`Dispatcher::send`] is awaited by the caller and resolves to exactly one
//!   query handler.

mod publish;

pub use publish::{FailureCallback, PublishHandle, PublishOptions, PublishOutcome};

use crate::{meta::type_info, registry::Registry};
use mandate_core::{
    Bound, CancellationToken, ContextFactory, DispatchError, Pipeline, Query, ResolutionContext,
    compose, select_query_handler,
};
use std::{fmt, sync::Arc};
use tokio::runtime::Handle;
use tracing::Instrument;

struct Shared<F> {
    factory: F,
    runtime: Option<Handle>,
    on_failure: Option<FailureCallback>,
}

/// Dispatches commands and queries through a [`ContextFactory`].
///
/// Cheap to clone; clones share configuration and factory.
pub struct Dispatcher<F: ContextFactory = Registry> {
    shared: Arc<Shared<F>>,
}

impl<F: ContextFactory> Clone for Dispatcher<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: ContextFactory> Dispatcher<F> {
    /// A dispatcher with default configuration.
    pub fn new(factory: F) -> Self {
        DispatcherBuilder::new(factory).build()
    }

    /// Configure a dispatcher.
    pub fn builder(factory: F) -> DispatcherBuilder<F> {
        DispatcherBuilder::new(factory)
    }

    /// The context factory.
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    /// Send `query` to its single handler and await the response.
    pub async fn send<Q: Query>(&self, query: Q) -> Result<Q::Response, DispatchError> {
        self.send_with(query, &CancellationToken::new()).await
    }

    /// Send `query`, observing `cancel`.
    pub async fn send_with<Q: Query>(
        &self,
        query: Q,
        cancel: &CancellationToken,
    ) -> Result<Q::Response, DispatchError> {
        self.send_optional(Some(query), cancel).await
    }

    /// Send a query that may be absent.
    ///
    /// `None` fails with [`DispatchError::MissingRequest`] before any
    /// resolution happens.
    pub async fn send_optional<Q: Query>(
        &self,
        query: Option<Q>,
        cancel: &CancellationToken,
    ) -> Result<Q::Response, DispatchError> {
        let Some(query) = query else {
            return Err(DispatchError::missing_request::<Q>());
        };
        let span = tracing::info_span!("send", request = %type_info::<Q>());
        self.run_query(&query, cancel).instrument(span).await
    }

    async fn run_query<Q: Query>(
        &self,
        query: &Q,
        cancel: &CancellationToken,
    ) -> Result<Q::Response, DispatchError> {
        let context = self.shared.factory.create_context();
        let candidates = context.query_handlers::<Q>();
        let selected = select_query_handler(query, &candidates, || context.query_selectors::<Q>())?;
        tracing::debug!(
            candidates = candidates.len(),
            handler = selected.type_name(),
            "query handler selected"
        );

        // Declared before either pipeline; both borrow from it.
        let request_behaviors = context.query_behaviors::<Q>();
        let handler = selected.instance();
        let handler_behaviors = context.query_handler_behaviors::<Q>(selected.type_id());
        let terminal = Pipeline::terminal(move |query, cancel| handler.handle_dyn(query, cancel));
        let handler_pipeline = compose(
            handler_behaviors
                .iter()
                .map(|behavior| Bound::new(&**behavior, handler.as_any())),
            query,
            terminal,
        );

        let pipeline = compose(
            request_behaviors.iter().map(|behavior| &**behavior),
            query,
            handler_pipeline,
        );
        tracing::debug!(behaviors = pipeline.len(), "query pipeline composed");

        pipeline
            .run(query, cancel)
            .await
            .map_err(DispatchError::from_boxed)
    }
}

impl<F: ContextFactory + fmt::Debug> fmt::Debug for Dispatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("factory", &self.shared.factory)
            .field("runtime", &self.shared.runtime.is_some())
            .field("on_failure", &self.shared.on_failure.is_some())
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<F> {
    factory: F,
    runtime: Option<Handle>,
    on_failure: Option<FailureCallback>,
}

impl<F: ContextFactory> DispatcherBuilder<F> {
    /// Start from `factory` with default settings.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            runtime: None,
            on_failure: None,
        }
    }

    /// Spawn published work on `handle` instead of the runtime current at
    /// publish time.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Default callback for failed publishes that carry no callback of their own.
    pub fn on_failure<C>(mut self, callback: C) -> Self
    where
        C: Fn(Arc<DispatchError>) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    /// Finish configuration.
    pub fn build(self) -> Dispatcher<F> {
        Dispatcher {
            shared: Arc::new(Shared {
                factory: self.factory,
                runtime: self.runtime,
                on_failure: self.on_failure,
            }),
        }
    }
}

#[cfg(test)]
mod tests;
