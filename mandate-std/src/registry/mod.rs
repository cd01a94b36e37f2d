//! Type-keyed registry of handlers, behaviors and selectors.
//!
//! A [`RegistryBuilder`] collects registrations and freezes them into a
//! [`Registry`]. The registry acts as the [`ContextFactory`] of a
//! dispatcher: every dispatch opens a fresh [`Scope`], which resolves
//! candidates in registration order and owns scoped instances until it is
//! dropped.
//!
//! Each registration is either shared (one instance for the lifetime of the
//! registry) or scoped (built by a factory at most once per scope).

mod scope;

pub use scope::Scope;

use crate::meta::type_info;
use mandate_core::{
    Command, CommandBehavior, CommandHandler, CommandHandlerBehavior, ContextFactory,
    DynCommandBehavior, DynCommandHandler, DynCommandHandlerBehavior, DynQueryBehavior,
    DynQueryHandler, DynQueryHandlerBehavior, EveryHandler, ForHandler, Query, QueryBehavior, QueryHandler,
    QueryHandlerBehavior, QueryHandlerSelector,
};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Shape {
    CommandHandler,
    CommandBehavior,
    CommandHandlerBehavior,
    QueryHandler,
    QueryBehavior,
    QueryHandlerBehavior,
    QuerySelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    shape: Shape,
    request: TypeId,
    handler: Option<TypeId>,
}

impl Key {
    fn of<R: 'static>(shape: Shape) -> Self {
        Self {
            shape,
            request: TypeId::of::<R>(),
            handler: None,
        }
    }

    fn bound<R: 'static>(shape: Shape, handler: TypeId) -> Self {
        Self {
            shape,
            request: TypeId::of::<R>(),
            handler: Some(handler),
        }
    }
}

/// How long a registered instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance, shared by every dispatch.
    Shared,
    /// One instance per dispatch scope.
    Scoped,
}

type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

enum Provider<T: ?Sized> {
    Shared(Arc<T>),
    Scoped(Factory<T>),
}

impl<T: ?Sized> Provider<T> {
    fn lifetime(&self) -> Lifetime {
        match self {
            Provider::Shared(_) => Lifetime::Shared,
            Provider::Scoped(_) => Lifetime::Scoped,
        }
    }
}

/// Metadata kept for each registration.
#[derive(Debug, Clone)]
pub struct RegistrationMeta {
    type_id: TypeId,
    type_name: &'static str,
    is_default: bool,
    lifetime: Lifetime,
}

impl RegistrationMeta {
    fn of<T: 'static>() -> Self {
        let info = type_info::<T>();
        Self {
            type_id: info.id(),
            type_name: info.name(),
            is_default: false,
            lifetime: Lifetime::Shared,
        }
    }

    /// Concrete type of the registered component.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Concrete type name of the registered component.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the component was registered as the default query handler.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Instance lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

struct Registration<T: ?Sized> {
    id: usize,
    provider: Provider<T>,
    meta: RegistrationMeta,
}

type Slot = Box<dyn Any + Send + Sync>;

struct Inner {
    slots: HashMap<Key, Slot>,
    metas: Vec<RegistrationMeta>,
}

/// A frozen set of registrations.
///
/// Cheap to clone; clones share the same registrations.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Start collecting registrations.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Total number of registrations of every shape.
    pub fn len(&self) -> usize {
        self.inner.metas.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.metas.is_empty()
    }

    /// Metadata of every registration, in registration order.
    pub fn registrations(&self) -> &[RegistrationMeta] {
        &self.inner.metas
    }

    /// Open a resolution scope.
    pub fn scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    fn entries<T: ?Sized + Send + Sync + 'static>(&self, key: Key) -> &[Registration<T>] {
        self.inner
            .slots
            .get(&key)
            .and_then(|slot| slot.downcast_ref::<Vec<Registration<T>>>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl ContextFactory for Registry {
    type Context = Scope;

    fn create_context(&self) -> Scope {
        self.scope()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.inner.metas.len())
            .finish()
    }
}

/// Collects registrations for a [`Registry`].
///
/// Handler-level behaviors are bound to one concrete handler type `H` and only
/// wrap handlers of that type. To wrap every handler of a request
/// individually, without access to the handler, use
/// [`command_behavior_for_each_handler`](Self::command_behavior_for_each_handler)
/// or [`query_behavior_for_each_handler`](Self::query_behavior_for_each_handler).
///
/// Type parameters come first so the request type can be named with a
/// turbofish and the rest inferred:
///
/// ```ignore
/// let registry = Registry::builder()
///     .command_handler::<PlaceOrder, _>(PlaceOrderHandler::default())
///     .query_handler::<GetOrder, _>(GetOrderHandler::new(store))
///     .build();
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    slots: HashMap<Key, Slot>,
    metas: Vec<RegistrationMeta>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push<T: ?Sized + Send + Sync + 'static>(
        mut self,
        key: Key,
        provider: Provider<T>,
        mut meta: RegistrationMeta,
    ) -> Self {
        meta.lifetime = provider.lifetime();
        let id = self.metas.len();
        self.metas.push(meta.clone());
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Box::new(Vec::<Registration<T>>::new()) as Slot);
        if let Some(list) = slot.downcast_mut::<Vec<Registration<T>>>() {
            list.push(Registration { id, provider, meta });
        }
        self
    }

    // Commands

    /// Register a shared command handler.
    pub fn command_handler<C, H>(self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let instance: Arc<dyn DynCommandHandler<C>> = Arc::new(handler);
        self.push(
            Key::of::<C>(Shape::CommandHandler),
            Provider::Shared(instance),
            RegistrationMeta::of::<H>(),
        )
    }

    /// Register a command handler built once per dispatch scope.
    pub fn scoped_command_handler<C, H, F>(self, factory: F) -> Self
    where
        C: Command,
        H: CommandHandler<C>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynCommandHandler<C>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn DynCommandHandler<C>>);
        self.push(
            Key::of::<C>(Shape::CommandHandler),
            Provider::Scoped(factory),
            RegistrationMeta::of::<H>(),
        )
    }

    /// Register a shared behavior around every dispatch of `C`.
    pub fn command_behavior<C, B>(self, behavior: B) -> Self
    where
        C: Command,
        B: CommandBehavior<C>,
    {
        let instance: Arc<dyn DynCommandBehavior<C>> = Arc::new(behavior);
        self.push(
            Key::of::<C>(Shape::CommandBehavior),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a per-scope behavior around every dispatch of `C`.
    pub fn scoped_command_behavior<C, B, F>(self, factory: F) -> Self
    where
        C: Command,
        B: CommandBehavior<C>,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynCommandBehavior<C>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn DynCommandBehavior<C>>);
        self.push(
            Key::of::<C>(Shape::CommandBehavior),
            Provider::Scoped(factory),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a shared behavior around the handler `H` of `C`.
    pub fn command_handler_behavior<C, H, B>(self, behavior: B) -> Self
    where
        C: Command,
        H: CommandHandler<C>,
        B: CommandHandlerBehavior<C, H>,
    {
        let instance: Arc<dyn DynCommandHandlerBehavior<C>> =
            Arc::new(ForHandler::<B, H>::new(behavior));
        self.push(
            Key::bound::<C>(Shape::CommandHandlerBehavior, TypeId::of::<H>()),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a per-scope behavior around the handler `H` of `C`.
    pub fn scoped_command_handler_behavior<C, H, B, F>(self, factory: F) -> Self
    where
        C: Command,
        H: CommandHandler<C>,
        B: CommandHandlerBehavior<C, H>,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynCommandHandlerBehavior<C>> = Arc::new(move || {
            Arc::new(ForHandler::<B, H>::new(factory())) as Arc<dyn DynCommandHandlerBehavior<C>>
        });
        self.push(
            Key::bound::<C>(Shape::CommandHandlerBehavior, TypeId::of::<H>()),
            Provider::Scoped(factory),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a shared behavior around each handler of `C`, whatever its type.
    ///
    /// It runs once per handler inside the fan-out, ordered together with
    /// the handler-level behaviors of that handler.
    pub fn command_behavior_for_each_handler<C, B>(self, behavior: B) -> Self
    where
        C: Command,
        B: CommandBehavior<C>,
    {
        let instance: Arc<dyn DynCommandHandlerBehavior<C>> =
            Arc::new(EveryHandler::new(behavior));
        self.push(
            Key::of::<C>(Shape::CommandHandlerBehavior),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    // Queries

    /// Register a shared query handler.
    pub fn query_handler<Q, H>(self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let instance: Arc<dyn DynQueryHandler<Q>> = Arc::new(handler);
        self.push_query_handler::<Q, H>(Provider::Shared(instance), false)
    }

    /// Register a shared query handler marked as the default for `Q`.
    ///
    /// The mark is only consulted by selectors such as
    /// [`DefaultHandlerSelector`](crate::selectors::DefaultHandlerSelector).
    pub fn default_query_handler<Q, H>(self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let instance: Arc<dyn DynQueryHandler<Q>> = Arc::new(handler);
        self.push_query_handler::<Q, H>(Provider::Shared(instance), true)
    }

    /// Register a query handler built once per dispatch scope.
    pub fn scoped_query_handler<Q, H, F>(self, factory: F) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynQueryHandler<Q>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn DynQueryHandler<Q>>);
        self.push_query_handler::<Q, H>(Provider::Scoped(factory), false)
    }

    fn push_query_handler<Q, H>(
        self,
        provider: Provider<dyn DynQueryHandler<Q>>,
        is_default: bool,
    ) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let mut meta = RegistrationMeta::of::<H>();
        meta.is_default = is_default;
        self.push(Key::of::<Q>(Shape::QueryHandler), provider, meta)
    }

    /// Register a shared behavior around every dispatch of `Q`.
    pub fn query_behavior<Q, B>(self, behavior: B) -> Self
    where
        Q: Query,
        B: QueryBehavior<Q>,
    {
        let instance: Arc<dyn DynQueryBehavior<Q>> = Arc::new(behavior);
        self.push(
            Key::of::<Q>(Shape::QueryBehavior),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a per-scope behavior around every dispatch of `Q`.
    pub fn scoped_query_behavior<Q, B, F>(self, factory: F) -> Self
    where
        Q: Query,
        B: QueryBehavior<Q>,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynQueryBehavior<Q>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn DynQueryBehavior<Q>>);
        self.push(
            Key::of::<Q>(Shape::QueryBehavior),
            Provider::Scoped(factory),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a shared behavior around the handler `H` of `Q`.
    pub fn query_handler_behavior<Q, H, B>(self, behavior: B) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
        B: QueryHandlerBehavior<Q, H>,
    {
        let instance: Arc<dyn DynQueryHandlerBehavior<Q>> =
            Arc::new(ForHandler::<B, H>::new(behavior));
        self.push(
            Key::bound::<Q>(Shape::QueryHandlerBehavior, TypeId::of::<H>()),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a per-scope behavior around the handler `H` of `Q`.
    pub fn scoped_query_handler_behavior<Q, H, B, F>(self, factory: F) -> Self
    where
        Q: Query,
        H: QueryHandler<Q>,
        B: QueryHandlerBehavior<Q, H>,
        F: Fn() -> B + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynQueryHandlerBehavior<Q>> = Arc::new(move || {
            Arc::new(ForHandler::<B, H>::new(factory())) as Arc<dyn DynQueryHandlerBehavior<Q>>
        });
        self.push(
            Key::bound::<Q>(Shape::QueryHandlerBehavior, TypeId::of::<H>()),
            Provider::Scoped(factory),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register a shared behavior around the selected handler of `Q`, whatever
    /// its type, ordered together with that handler's handler-level behaviors.
    pub fn query_behavior_for_each_handler<Q, B>(self, behavior: B) -> Self
    where
        Q: Query,
        B: QueryBehavior<Q>,
    {
        let instance: Arc<dyn DynQueryHandlerBehavior<Q>> =
            Arc::new(EveryHandler::new(behavior));
        self.push(
            Key::of::<Q>(Shape::QueryHandlerBehavior),
            Provider::Shared(instance),
            RegistrationMeta::of::<B>(),
        )
    }

    /// Register the handler selector for `Q`.
    ///
    /// Registering more than one selector for the same query type is not
    /// rejected here; dispatches of `Q` with several candidates fail instead.
    pub fn query_selector<Q, S>(self, selector: S) -> Self
    where
        Q: Query,
        S: QueryHandlerSelector<Q>,
    {
        let instance: Arc<dyn QueryHandlerSelector<Q>> = Arc::new(selector);
        self.push(
            Key::of::<Q>(Shape::QuerySelector),
            Provider::Shared(instance),
            RegistrationMeta::of::<S>(),
        )
    }

    /// Register a handler selector for `Q` built once per dispatch scope.
    pub fn scoped_query_selector<Q, S, F>(self, factory: F) -> Self
    where
        Q: Query,
        S: QueryHandlerSelector<Q>,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let factory: Factory<dyn QueryHandlerSelector<Q>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn QueryHandlerSelector<Q>>);
        self.push(
            Key::of::<Q>(Shape::QuerySelector),
            Provider::Scoped(factory),
            RegistrationMeta::of::<S>(),
        )
    }

    /// Freeze the registrations.
    pub fn build(self) -> Registry {
        tracing::debug!(registrations = self.metas.len(), "registry built");
        Registry {
            inner: Arc::new(Inner {
                slots: self.slots,
                metas: self.metas,
            }),
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("registrations", &self.metas.len())
            .finish()
    }
}
