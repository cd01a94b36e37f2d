//! Conditional behaviors.

use mandate_core::{
    BoxError, CancellationToken, Command, CommandBehavior, Next, Query, QueryBehavior,
};

/// Runs `inner` only for requests accepted by `predicate`.
///
/// The predicate is combined with the inner behavior's own `should_run`, so a
/// rejected request skips the behavior entirely rather than passing through it.
///
/// ```ignore
/// let audited = When::new(|order: &PlaceOrder| order.total > 10_000, AuditBehavior::new(log));
/// ```
#[derive(Debug, Clone)]
pub struct When<P, B> {
    predicate: P,
    inner: B,
}

impl<P, B> When<P, B> {
    /// Wrap `inner` with `predicate`.
    pub fn new(predicate: P, inner: B) -> Self {
        Self { predicate, inner }
    }

    /// The wrapped behavior.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<C, P, B> CommandBehavior<C> for When<P, B>
where
    C: Command,
    P: Fn(&C) -> bool + Send + Sync + 'static,
    B: CommandBehavior<C>,
{
    fn order(&self) -> Option<i32> {
        self.inner.order()
    }

    fn should_run(&self, command: &C) -> bool {
        (self.predicate)(command) && self.inner.should_run(command)
    }

    fn handle(
        &self,
        command: &C,
        next: Next<'_, C, ()>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        self.inner.handle(command, next, cancel)
    }
}

impl<Q, P, B> QueryBehavior<Q> for When<P, B>
where
    Q: Query,
    P: Fn(&Q) -> bool + Send + Sync + 'static,
    B: QueryBehavior<Q>,
{
    fn order(&self) -> Option<i32> {
        self.inner.order()
    }

    fn should_run(&self, query: &Q) -> bool {
        (self.predicate)(query) && self.inner.should_run(query)
    }

    fn handle(
        &self,
        query: &Q,
        next: Next<'_, Q, Q::Response>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Q::Response, BoxError>> + Send {
        self.inner.handle(query, next, cancel)
    }
}
