#![allow(dead_code)]

use mandate::{
    BoxError, CancellationToken, Command, CommandHandler, CommandHandlerBehavior, CommandKind,
    Next, Query, QueryCandidate, QueryHandler, QueryHandlerBehavior, QueryHandlerSelector,
    QueryKind, Request, testing::Trace,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Barrier;

// ============================================================================
// Test Request Types
// ============================================================================

#[derive(Clone, Debug)]
pub struct Ping {
    pub id: u32,
}

impl Request for Ping {
    type Kind = CommandKind;
}

impl Command for Ping {}

/// A command nobody handles.
#[derive(Clone, Debug)]
pub struct Orphan;

impl Request for Orphan {
    type Kind = CommandKind;
}

impl Command for Orphan {}

#[derive(Clone, Debug)]
pub struct Lookup {
    pub key: &'static str,
}

impl Request for Lookup {
    type Kind = QueryKind;
}

impl Query for Lookup {
    type Response = String;
}

/// A query nobody handles.
#[derive(Clone, Debug)]
pub struct Unanswered;

impl Request for Unanswered {
    type Kind = QueryKind;
}

impl Query for Unanswered {
    type Response = u64;
}

// ============================================================================
// Test Handlers
// ============================================================================

/// Answers every lookup with `"<name>:<key>"`.
pub struct NamedLookup {
    pub name: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl NamedLookup {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl QueryHandler<Lookup> for NamedLookup {
    async fn handle(&self, query: &Lookup, _cancel: &CancellationToken) -> Result<String, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}:{}", self.name, query.key))
    }
}

/// A second handler type for `Lookup`, so candidates differ by type.
pub struct UpperLookup;

impl QueryHandler<Lookup> for UpperLookup {
    async fn handle(&self, query: &Lookup, _cancel: &CancellationToken) -> Result<String, BoxError> {
        Ok(query.key.to_uppercase())
    }
}

/// Fails every lookup with `message`.
pub struct BrokenLookup {
    pub message: &'static str,
}

impl QueryHandler<Lookup> for BrokenLookup {
    async fn handle(&self, _query: &Lookup, _cancel: &CancellationToken) -> Result<String, BoxError> {
        Err(self.message.into())
    }
}

/// Waits at `barrier` before completing; two of these only finish when they
/// run concurrently.
pub struct Rendezvous {
    pub barrier: Arc<Barrier>,
    pub trace: Trace,
    pub label: &'static str,
}

impl CommandHandler<Ping> for Rendezvous {
    async fn handle(&self, _command: &Ping, _cancel: &CancellationToken) -> Result<(), BoxError> {
        self.trace.record(format!("{}:arrived", self.label));
        tokio::time::timeout(Duration::from_secs(5), self.barrier.wait())
            .await
            .map_err(|_| "handlers did not run concurrently")?;
        self.trace.record(format!("{}:done", self.label));
        Ok(())
    }
}

/// Sleeps until cancelled, then reports the cancellation.
pub struct UntilCancelled;

impl CommandHandler<Ping> for UntilCancelled {
    async fn handle(&self, _command: &Ping, cancel: &CancellationToken) -> Result<(), BoxError> {
        cancel.cancelled().await;
        cancel.check()?;
        Ok(())
    }
}

/// Panics after `delay`.
pub struct Detonate {
    pub delay: Duration,
}

impl CommandHandler<Ping> for Detonate {
    async fn handle(&self, _command: &Ping, _cancel: &CancellationToken) -> Result<(), BoxError> {
        tokio::time::sleep(self.delay).await;
        panic!("detonated");
    }
}

/// Sets `finished` after `delay`.
pub struct SlowFinisher {
    pub delay: Duration,
    pub finished: Arc<AtomicBool>,
}

impl CommandHandler<Ping> for SlowFinisher {
    async fn handle(&self, _command: &Ping, _cancel: &CancellationToken) -> Result<(), BoxError> {
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Takes `delay` to answer.
pub struct SlowLookup {
    pub delay: Duration,
}

impl QueryHandler<Lookup> for SlowLookup {
    async fn handle(&self, query: &Lookup, _cancel: &CancellationToken) -> Result<String, BoxError> {
        tokio::time::sleep(self.delay).await;
        Ok(query.key.to_string())
    }
}

// ============================================================================
// Test Selectors
// ============================================================================

/// Picks the candidate whose concrete type is `UpperLookup`.
pub struct PreferUpper;

impl QueryHandlerSelector<Lookup> for PreferUpper {
    fn select<'c>(
        &self,
        _query: &Lookup,
        candidates: &'c [QueryCandidate<Lookup>],
    ) -> Option<&'c QueryCandidate<Lookup>> {
        candidates.iter().find(|candidate| candidate.is::<UpperLookup>())
    }
}

/// Never picks anything.
pub struct Undecided;

impl QueryHandlerSelector<Lookup> for Undecided {
    fn select<'c>(
        &self,
        _query: &Lookup,
        _candidates: &'c [QueryCandidate<Lookup>],
    ) -> Option<&'c QueryCandidate<Lookup>> {
        None
    }
}

// ============================================================================
// Test Behaviors
// ============================================================================

/// Handler-level behavior that records the name of the handler it wraps.
pub struct SeesHandler {
    pub trace: Trace,
}

impl QueryHandlerBehavior<Lookup, NamedLookup> for SeesHandler {
    async fn handle(
        &self,
        _query: &Lookup,
        handler: &NamedLookup,
        next: Next<'_, Lookup, String>,
        _cancel: &CancellationToken,
    ) -> Result<String, BoxError> {
        self.trace.record(format!("wraps:{}", handler.name));
        next.run().await
    }
}

impl CommandHandlerBehavior<Ping, mandate::testing::CountingHandler> for SeesHandler {
    async fn handle(
        &self,
        _command: &Ping,
        handler: &mandate::testing::CountingHandler,
        next: Next<'_, Ping, ()>,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.trace.record(format!("wraps:counting:{}", handler.count()));
        next.run().await
    }
}
