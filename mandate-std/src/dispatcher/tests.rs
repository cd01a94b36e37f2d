use super::*;
use crate::{registry::Scope, testing::FailureSink};
use mandate_core::{BoxError, Command, CommandHandler, CommandKind, QueryHandler, QueryKind, Request};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Explode;

impl Request for Explode {
    type Kind = CommandKind;
}

impl Command for Explode {}

#[derive(Debug)]
struct Double(u32);

impl Request for Double {
    type Kind = QueryKind;
}

impl Query for Double {
    type Response = u32;
}

struct Panicking;

impl CommandHandler<Explode> for Panicking {
    async fn handle(&self, _command: &Explode, _cancel: &CancellationToken) -> Result<(), BoxError> {
        panic!("handler blew up");
    }
}

/// Finishes after the panicking sibling has already unwound.
struct Straggler {
    done: Arc<AtomicUsize>,
}

impl CommandHandler<Explode> for Straggler {
    async fn handle(&self, _command: &Explode, _cancel: &CancellationToken) -> Result<(), BoxError> {
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Doubler;

impl QueryHandler<Double> for Doubler {
    async fn handle(&self, query: &Double, _cancel: &CancellationToken) -> Result<u32, BoxError> {
        Ok(query.0 * 2)
    }
}

/// Counts the contexts it opens.
struct CountingFactory {
    registry: Registry,
    opened: AtomicUsize,
}

impl ContextFactory for CountingFactory {
    type Context = Scope;

    fn create_context(&self) -> Scope {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.registry.scope()
    }
}

#[tokio::test]
async fn test_every_send_opens_a_fresh_context() {
    let factory = Arc::new(CountingFactory {
        registry: Registry::builder().query_handler::<Double, _>(Doubler).build(),
        opened: AtomicUsize::new(0),
    });
    let dispatcher = Dispatcher::new(Arc::clone(&factory));

    assert_eq!(dispatcher.send(Double(2)).await.unwrap(), 4);
    assert_eq!(dispatcher.send(Double(5)).await.unwrap(), 10);
    assert_eq!(factory.opened.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_query_opens_no_context() {
    let factory = Arc::new(CountingFactory {
        registry: Registry::builder().query_handler::<Double, _>(Doubler).build(),
        opened: AtomicUsize::new(0),
    });
    let dispatcher = Dispatcher::new(Arc::clone(&factory));

    let err = dispatcher
        .send_optional::<Double>(None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::MissingRequest { .. }));
    assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_handler_is_reported_as_task_failure() {
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::builder(
        Registry::builder()
            .command_handler::<Explode, _>(Panicking)
            .build(),
    )
    .on_failure(sink.callback())
    .build();

    let outcome = dispatcher.publish(Explode).wait().await;
    match outcome.error() {
        Some(DispatchError::TaskFailed(message)) => assert_eq!(message, "handler blew up"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_panic_in_one_branch_lets_siblings_finish() {
    let done = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::new(
        Registry::builder()
            .command_handler::<Explode, _>(Panicking)
            .command_handler::<Explode, _>(Straggler {
                done: Arc::clone(&done),
            })
            .build(),
    );

    let outcome = dispatcher.publish(Explode).wait().await;

    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert!(matches!(
        outcome.error(),
        Some(DispatchError::TaskFailed(message)) if message == "handler blew up"
    ));
}

#[test]
fn test_publish_on_configured_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::builder(Registry::builder().build())
        .runtime(runtime.handle().clone())
        .on_failure(sink.callback())
        .build();

    // Called outside any runtime context.
    let handle = dispatcher.publish(Explode);
    let outcome = runtime.block_on(handle.wait());

    assert!(matches!(
        outcome.error(),
        Some(DispatchError::NoHandlerRegistered { .. })
    ));
    assert_eq!(sink.count(), 1);
}
