use super::Dispatcher;
use crate::meta::type_info;
use futures::{
    FutureExt,
    future::{BoxFuture, join_all},
};
use mandate_core::{
    BoxError, Bound, CancellationToken, Command, CommandCandidate, ContextFactory, DispatchError,
    Pipeline, ResolutionContext, compose,
};
use std::{any::Any, fmt, panic::AssertUnwindSafe, sync::Arc};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Receives failures of published commands.
pub type FailureCallback = Arc<dyn Fn(Arc<DispatchError>) + Send + Sync>;

/// Per-call settings for [`Dispatcher::publish_with`].
#[derive(Clone, Default)]
pub struct PublishOptions {
    on_failure: Option<FailureCallback>,
    cancel: CancellationToken,
}

impl PublishOptions {
    /// Default options: a fresh token and the dispatcher's failure callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failures of this publish to `callback` instead of the
    /// dispatcher's default.
    pub fn on_failure<C>(mut self, callback: C) -> Self
    where
        C: Fn(Arc<DispatchError>) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    /// Observe `token` while the command runs.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

impl fmt::Debug for PublishOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishOptions")
            .field("on_failure", &self.on_failure.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// How a published command ended.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Every handler completed.
    Completed,
    /// Resolution or execution failed. The same error was passed to the
    /// failure callback.
    Failed(Arc<DispatchError>),
    /// The cancellation token fired before or during execution.
    Cancelled,
}

impl PublishOutcome {
    /// Whether every handler completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, PublishOutcome::Completed)
    }

    /// Whether the publish was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PublishOutcome::Cancelled)
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            PublishOutcome::Failed(err) => Some(&**err),
            _ => None,
        }
    }
}

/// Handle to a published command's unit of work.
///
/// Dropping the handle detaches the work; it keeps running.
#[derive(Debug)]
pub struct PublishHandle {
    join: JoinHandle<PublishOutcome>,
}

impl PublishHandle {
    /// Wait for the unit of work to finish.
    pub async fn wait(self) -> PublishOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => PublishOutcome::Failed(Arc::new(DispatchError::TaskFailed(err.to_string()))),
        }
    }

    /// Whether the unit of work has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<F: ContextFactory> Dispatcher<F> {
    /// Publish `command` to all of its handlers.
    ///
    /// Returns once the unit of work is scheduled. Must be called from within
    /// a tokio runtime unless the dispatcher was built with one.
    pub fn publish<C: Command>(&self, command: C) -> PublishHandle {
        self.publish_with(command, PublishOptions::default())
    }

    /// Publish `command` with per-call options.
    pub fn publish_with<C: Command>(&self, command: C, options: PublishOptions) -> PublishHandle {
        let PublishOptions { on_failure, cancel } = options;
        let on_failure = on_failure.or_else(|| self.shared.on_failure.clone());
        let dispatcher = self.clone();
        let span = tracing::info_span!("publish", request = %type_info::<C>());

        let work = async move {
            if cancel.is_cancelled() {
                tracing::debug!("publish cancelled before start");
                return PublishOutcome::Cancelled;
            }

            let result = AssertUnwindSafe(dispatcher.run_command(&command, &cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(DispatchError::TaskFailed(panic_message(&*panic))));

            match result {
                Ok(()) => {
                    tracing::debug!("publish completed");
                    PublishOutcome::Completed
                }
                Err(err) if cancel.is_cancelled() && err.is_cancellation() => {
                    tracing::debug!(error = %err, "publish cancelled");
                    PublishOutcome::Cancelled
                }
                Err(err) => {
                    tracing::error!(error = %err, "publish failed");
                    let err = Arc::new(err);
                    if let Some(callback) = &on_failure {
                        callback(Arc::clone(&err));
                    }
                    PublishOutcome::Failed(err)
                }
            }
        }
        .instrument(span);

        let join = match &self.shared.runtime {
            Some(runtime) => runtime.spawn(work),
            None => tokio::spawn(work),
        };
        PublishHandle { join }
    }

    /// Publish a command that may be absent.
    ///
    /// `None` fails with [`DispatchError::MissingRequest`] before anything is
    /// scheduled.
    pub fn publish_optional<C: Command>(
        &self,
        command: Option<C>,
        options: PublishOptions,
    ) -> Result<PublishHandle, DispatchError> {
        match command {
            Some(command) => Ok(self.publish_with(command, options)),
            None => Err(DispatchError::missing_request::<C>()),
        }
    }

    async fn run_command<C: Command>(
        &self,
        command: &C,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let context = self.shared.factory.create_context();
        let handlers = context.command_handlers::<C>();
        if handlers.is_empty() {
            return Err(DispatchError::no_handler::<C>());
        }
        tracing::debug!(handlers = handlers.len(), "command handlers resolved");

        let behaviors = context.command_behaviors::<C>();
        let terminal =
            Pipeline::terminal(|command, cancel| fan_out(&context, &handlers, command, cancel));
        let pipeline = compose(behaviors.iter().map(|behavior| &**behavior), command, terminal);
        tracing::debug!(behaviors = pipeline.len(), "command pipeline composed");

        pipeline
            .run(command, cancel)
            .await
            .map_err(DispatchError::from_boxed)
    }
}

/// Run every handler's pipeline concurrently and wait for all of them.
fn fan_out<'a, X, C>(
    context: &'a X,
    handlers: &'a [CommandCandidate<C>],
    command: &'a C,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<(), BoxError>>
where
    X: ResolutionContext,
    C: Command,
{
    Box::pin(async move {
        // A panicking branch fails on its own; siblings keep running.
        let runs = handlers.iter().map(|candidate| {
            AssertUnwindSafe(run_handler(context, candidate, command, cancel))
                .catch_unwind()
                .map(flatten_panic)
        });
        let failures: Vec<BoxError> = join_all(runs)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        match DispatchError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    })
}

fn flatten_panic(
    result: Result<Result<(), BoxError>, Box<dyn Any + Send>>,
) -> Result<(), BoxError> {
    result.unwrap_or_else(|panic| {
        Err(Box::new(DispatchError::TaskFailed(panic_message(&*panic))) as BoxError)
    })
}

async fn run_handler<X, C>(
    context: &X,
    candidate: &CommandCandidate<C>,
    command: &C,
    cancel: &CancellationToken,
) -> Result<(), BoxError>
where
    X: ResolutionContext,
    C: Command,
{
    let handler = candidate.instance();
    let behaviors = context.command_handler_behaviors::<C>(candidate.type_id());
    let terminal = Pipeline::terminal(move |command, cancel| handler.handle_dyn(command, cancel));
    let pipeline = compose(
        behaviors
            .iter()
            .map(|behavior| Bound::new(&**behavior, handler.as_any())),
        command,
        terminal,
    );
    tracing::trace!(
        handler = candidate.type_name(),
        behaviors = pipeline.len(),
        "running command handler"
    );
    pipeline.run(command, cancel).await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
