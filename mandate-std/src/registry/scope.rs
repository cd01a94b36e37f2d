use super::{Key, Provider, Registration, Registry, Shape};
use mandate_core::{
    Candidate, Command, CommandCandidate, DynCommandBehavior, DynCommandHandlerBehavior,
    DynQueryBehavior, DynQueryHandlerBehavior, Query, QueryCandidate, QueryHandlerSelector,
    ResolutionContext,
};
use parking_lot::Mutex;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

/// One dispatch worth of resolutions.
///
/// Shared registrations resolve to the registry's instance. Scoped
/// registrations are built on first resolution and reused for the rest of
/// the scope, then dropped with it.
pub struct Scope {
    registry: Registry,
    instances: Mutex<HashMap<usize, Box<dyn Any + Send + Sync>>>,
}

impl Scope {
    pub(super) fn new(registry: Registry) -> Self {
        Self {
            registry,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Number of scoped instances built so far.
    pub fn scoped_instances(&self) -> usize {
        self.instances.lock().len()
    }

    fn resolve<T: ?Sized + Send + Sync + 'static>(&self, registration: &Registration<T>) -> Arc<T> {
        let factory = match &registration.provider {
            Provider::Shared(instance) => return Arc::clone(instance),
            Provider::Scoped(factory) => factory,
        };

        if let Some(existing) = self.cached::<T>(registration.id) {
            return existing;
        }

        // Built outside the lock; a factory may resolve through the registry itself.
        let created = factory();
        let mut instances = self.instances.lock();
        let slot = instances
            .entry(registration.id)
            .or_insert_with(|| Box::new(Arc::clone(&created)) as Box<dyn Any + Send + Sync>);
        slot.downcast_ref::<Arc<T>>()
            .map(Arc::clone)
            .unwrap_or(created)
    }

    fn cached<T: ?Sized + Send + Sync + 'static>(&self, id: usize) -> Option<Arc<T>> {
        self.instances
            .lock()
            .get(&id)
            .and_then(|slot| slot.downcast_ref::<Arc<T>>())
            .map(Arc::clone)
    }

    fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self, key: Key) -> Vec<Arc<T>> {
        self.registry
            .entries::<T>(key)
            .iter()
            .map(|registration| self.resolve(registration))
            .collect()
    }

    /// Handler-level registrations for every handler plus those bound to one
    /// handler type, in registration order.
    fn resolve_handler_level<T: ?Sized + Send + Sync + 'static>(
        &self,
        every: Key,
        bound: Key,
    ) -> Vec<Arc<T>> {
        let mut registrations: Vec<&Registration<T>> = self
            .registry
            .entries::<T>(every)
            .iter()
            .chain(self.registry.entries::<T>(bound))
            .collect();
        registrations.sort_by_key(|registration| registration.id);
        registrations
            .into_iter()
            .map(|registration| self.resolve(registration))
            .collect()
    }

    fn candidates<T: ?Sized + Send + Sync + 'static>(&self, key: Key) -> Vec<Candidate<T>> {
        self.registry
            .entries::<T>(key)
            .iter()
            .map(|registration| {
                Candidate::new(
                    self.resolve(registration),
                    registration.meta.type_id,
                    registration.meta.type_name,
                )
                .with_default(registration.meta.is_default)
            })
            .collect()
    }
}

impl ResolutionContext for Scope {
    fn command_handlers<C: Command>(&self) -> Vec<CommandCandidate<C>> {
        self.candidates(Key::of::<C>(Shape::CommandHandler))
    }

    fn command_behaviors<C: Command>(&self) -> Vec<Arc<dyn DynCommandBehavior<C>>> {
        self.resolve_all(Key::of::<C>(Shape::CommandBehavior))
    }

    fn command_handler_behaviors<C: Command>(
        &self,
        handler: TypeId,
    ) -> Vec<Arc<dyn DynCommandHandlerBehavior<C>>> {
        self.resolve_handler_level(
            Key::of::<C>(Shape::CommandHandlerBehavior),
            Key::bound::<C>(Shape::CommandHandlerBehavior, handler),
        )
    }

    fn query_handlers<Q: Query>(&self) -> Vec<QueryCandidate<Q>> {
        self.candidates(Key::of::<Q>(Shape::QueryHandler))
    }

    fn query_behaviors<Q: Query>(&self) -> Vec<Arc<dyn DynQueryBehavior<Q>>> {
        self.resolve_all(Key::of::<Q>(Shape::QueryBehavior))
    }

    fn query_handler_behaviors<Q: Query>(
        &self,
        handler: TypeId,
    ) -> Vec<Arc<dyn DynQueryHandlerBehavior<Q>>> {
        self.resolve_handler_level(
            Key::of::<Q>(Shape::QueryHandlerBehavior),
            Key::bound::<Q>(Shape::QueryHandlerBehavior, handler),
        )
    }

    fn query_selectors<Q: Query>(&self) -> Vec<Arc<dyn QueryHandlerSelector<Q>>> {
        self.resolve_all(Key::of::<Q>(Shape::QuerySelector))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("registry", &self.registry)
            .field("scoped_instances", &self.scoped_instances())
            .finish()
    }
}
