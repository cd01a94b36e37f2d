//! Resolution context.
//!
//! The dispatcher never discovers handlers itself. For every dispatch it asks
//! a [`ContextFactory`] for a fresh [`ResolutionContext`] and pulls candidate
//! handlers, behaviors and selectors from it. The context owns whatever
//! instances it hands out for the duration of that one dispatch.

use crate::{
    behavior::{
        DynCommandBehavior, DynCommandHandlerBehavior, DynQueryBehavior, DynQueryHandlerBehavior,
    },
    handler::{DynCommandHandler, DynQueryHandler},
    request::{Command, Query},
    selector::QueryHandlerSelector,
};
use std::{any::TypeId, fmt, sync::Arc};

/// A resolved handler together with its concrete type identity.
pub struct Candidate<T: ?Sized> {
    instance: Arc<T>,
    type_id: TypeId,
    type_name: &'static str,
    is_default: bool,
}

/// A command handler candidate.
pub type CommandCandidate<C> = Candidate<dyn DynCommandHandler<C>>;

/// A query handler candidate.
pub type QueryCandidate<Q> = Candidate<dyn DynQueryHandler<Q>>;

impl<T: ?Sized> Candidate<T> {
    /// Wrap `instance`, whose concrete type is identified by `type_id` and `type_name`.
    pub fn new(instance: Arc<T>, type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            instance,
            type_id,
            type_name,
            is_default: false,
        }
    }

    /// Mark this candidate as the default choice for its request type.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// The handler instance.
    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// The shared handle to the handler instance.
    pub fn shared(&self) -> &Arc<T> {
        &self.instance
    }

    /// Concrete handler type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Concrete handler type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the handler was registered as the default for its request type.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Whether the concrete handler type is `H`.
    pub fn is<H: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<H>()
    }
}

impl<T: ?Sized> Clone for Candidate<T> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            type_id: self.type_id,
            type_name: self.type_name,
            is_default: self.is_default,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("type_name", &self.type_name)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Supplies candidates for a single dispatch.
///
/// Results keep registration order. Lookups are keyed by type, never by
/// request value.
pub trait ResolutionContext: Send + Sync {
    /// All handlers registered for the command type `C`.
    fn command_handlers<C: Command>(&self) -> Vec<CommandCandidate<C>>;

    /// Request-level behaviors for `C`.
    fn command_behaviors<C: Command>(&self) -> Vec<Arc<dyn DynCommandBehavior<C>>>;

    /// Handler-level behaviors for `C` bound to the handler type `handler`.
    fn command_handler_behaviors<C: Command>(
        &self,
        handler: TypeId,
    ) -> Vec<Arc<dyn DynCommandHandlerBehavior<C>>>;

    /// All handlers registered for the query type `Q`.
    fn query_handlers<Q: Query>(&self) -> Vec<QueryCandidate<Q>>;

    /// Request-level behaviors for `Q`.
    fn query_behaviors<Q: Query>(&self) -> Vec<Arc<dyn DynQueryBehavior<Q>>>;

    /// Handler-level behaviors for `Q` bound to the handler type `handler`.
    fn query_handler_behaviors<Q: Query>(
        &self,
        handler: TypeId,
    ) -> Vec<Arc<dyn DynQueryHandlerBehavior<Q>>>;

    /// Selectors registered for `Q`. More than one is a configuration error.
    fn query_selectors<Q: Query>(&self) -> Vec<Arc<dyn QueryHandlerSelector<Q>>>;
}

/// Creates one [`ResolutionContext`] per dispatch.
pub trait ContextFactory: Send + Sync + 'static {
    /// The context type handed to each dispatch.
    type Context: ResolutionContext;

    /// Open a fresh context.
    fn create_context(&self) -> Self::Context;
}

impl<F: ContextFactory> ContextFactory for Arc<F> {
    type Context = F::Context;

    fn create_context(&self) -> Self::Context {
        (**self).create_context()
    }
}
