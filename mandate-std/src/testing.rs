//! Testing utilities for Mandate.
//!
//! # Features
//!
//! - [`Trace`]: a shared, ordered log of what ran
//! - [`RecordingBehavior`]: a behavior of any shape that logs entry and exit
//! - [`CountingHandler`]: a command handler that counts invocations
//! - [`FailingHandler`]: a command handler that always fails
//! - [`FailureSink`]: collects errors passed to a publish failure callback

use mandate_core::{
    BoxError, CancellationToken, Command, CommandBehavior, CommandHandler, CommandHandlerBehavior,
    DispatchError, Next, Query, QueryBehavior, QueryHandler, QueryHandlerBehavior,
};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Trace
// ============================================================================

/// An ordered log shared between test components.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Everything recorded so far, in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forget all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ============================================================================
// Recording Behavior
// ============================================================================

/// A behavior that records `"<label>:enter"` and `"<label>:exit"` around the
/// rest of the chain.
///
/// Implements all four behavior shapes for every request and handler type.
///
/// # Example
///
/// ```rust,ignore
/// let trace = Trace::new();
/// let registry = Registry::builder()
///     .command_handler::<Ping, _>(CountingHandler::new().traced("handler", trace.clone()))
///     .command_behavior::<Ping, _>(RecordingBehavior::new("outer", trace.clone()).with_order(0))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    label: &'static str,
    order: Option<i32>,
    trace: Trace,
    calls: Arc<AtomicUsize>,
}

impl RecordingBehavior {
    /// A behavior without an explicit order.
    pub fn new(label: &'static str, trace: Trace) -> Self {
        Self {
            label,
            order: None,
            trace,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the precedence key.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Number of times the behavior was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn around<R, T>(&self, next: Next<'_, R, T>) -> Result<T, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.trace.record(format!("{}:enter", self.label));
        let result = next.run().await;
        self.trace.record(format!("{}:exit", self.label));
        result
    }
}

impl<C: Command> CommandBehavior<C> for RecordingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _command: &C,
        next: Next<'_, C, ()>,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.around(next).await
    }
}

impl<Q: Query> QueryBehavior<Q> for RecordingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _query: &Q,
        next: Next<'_, Q, Q::Response>,
        _cancel: &CancellationToken,
    ) -> Result<Q::Response, BoxError> {
        self.around(next).await
    }
}

impl<C: Command, H: CommandHandler<C>> CommandHandlerBehavior<C, H> for RecordingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _command: &C,
        _handler: &H,
        next: Next<'_, C, ()>,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.around(next).await
    }
}

impl<Q: Query, H: QueryHandler<Q>> QueryHandlerBehavior<Q, H> for RecordingBehavior {
    fn order(&self) -> Option<i32> {
        self.order
    }

    async fn handle(
        &self,
        _query: &Q,
        _handler: &H,
        next: Next<'_, Q, Q::Response>,
        _cancel: &CancellationToken,
    ) -> Result<Q::Response, BoxError> {
        self.around(next).await
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A command handler that counts invocations.
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
    trace: Option<(&'static str, Trace)>,
}

impl CountingHandler {
    /// A handler with a fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also record `label` in `trace` on every invocation.
    pub fn traced(mut self, label: &'static str, trace: Trace) -> Self {
        self.trace = Some((label, trace));
        self
    }

    /// Number of invocations.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<C: Command> CommandHandler<C> for CountingHandler {
    async fn handle(&self, _command: &C, _cancel: &CancellationToken) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Some((label, trace)) = &self.trace {
            trace.record(*label);
        }
        Ok(())
    }
}

// ============================================================================
// Failing Handler
// ============================================================================

/// A command handler that always fails with `message`.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: &'static str,
}

impl FailingHandler {
    /// A handler failing with `message`.
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl<C: Command> CommandHandler<C> for FailingHandler {
    async fn handle(&self, _command: &C, _cancel: &CancellationToken) -> Result<(), BoxError> {
        Err(self.message.into())
    }
}

// ============================================================================
// Failure Sink
// ============================================================================

/// Collects the errors handed to a publish failure callback.
///
/// # Example
///
/// ```rust,ignore
/// let sink = FailureSink::new();
/// dispatcher.publish_with(Ping, PublishOptions::new().on_failure(sink.callback()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FailureSink {
    errors: Arc<Mutex<Vec<Arc<DispatchError>>>>,
}

impl FailureSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback feeding this sink.
    pub fn callback(&self) -> impl Fn(Arc<DispatchError>) + Send + Sync + 'static {
        let errors = Arc::clone(&self.errors);
        move |err| errors.lock().push(err)
    }

    /// Errors received so far, in order.
    pub fn errors(&self) -> Vec<Arc<DispatchError>> {
        self.errors.lock().clone()
    }

    /// Number of errors received.
    pub fn count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Whether no error was received.
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}
