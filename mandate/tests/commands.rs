use mandate::{
    CancellationToken, DispatchError, Dispatcher, PublishOptions, PublishOutcome, Registry,
    testing::{CountingHandler, FailingHandler, FailureSink, RecordingBehavior, Trace},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::Barrier;

mod common;
use common::{Detonate, Orphan, Ping, Rendezvous, SlowFinisher, UntilCancelled};

#[tokio::test]
async fn test_publish_without_handlers_reports_no_handler() {
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::new(Registry::builder().build());

    let outcome = dispatcher
        .publish_with(Orphan, PublishOptions::new().on_failure(sink.callback()))
        .wait()
        .await;

    assert!(matches!(
        outcome.error(),
        Some(DispatchError::NoHandlerRegistered { .. })
    ));
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(*errors[0], DispatchError::NoHandlerRegistered { .. }));
    assert!(errors[0].request_type().unwrap().ends_with("Orphan"));
}

#[tokio::test]
async fn test_publish_without_handlers_runs_no_behavior() {
    let trace = Trace::new();
    let behavior = RecordingBehavior::new("outer", trace.clone());
    let registry = Registry::builder()
        .command_behavior::<Orphan, _>(behavior.clone())
        .build();

    let outcome = Dispatcher::new(registry).publish(Orphan).wait().await;

    assert!(outcome.error().is_some());
    assert_eq!(behavior.calls(), 0);
    assert!(trace.is_empty());
}

#[tokio::test]
async fn test_every_handler_runs_once() {
    let first = CountingHandler::new();
    let second = CountingHandler::new();
    let registry = Registry::builder()
        .command_handler::<Ping, _>(first.clone())
        .command_handler::<Ping, _>(second.clone())
        .build();

    let outcome = Dispatcher::new(registry).publish(Ping { id: 1 }).wait().await;

    assert!(outcome.is_completed());
    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handlers_run_concurrently_and_completion_waits_for_all() {
    let trace = Trace::new();
    let barrier = Arc::new(Barrier::new(2));
    let registry = Registry::builder()
        .command_handler::<Ping, _>(Rendezvous {
            barrier: Arc::clone(&barrier),
            trace: trace.clone(),
            label: "a",
        })
        .command_handler::<Ping, _>(Rendezvous {
            barrier,
            trace: trace.clone(),
            label: "b",
        })
        .build();

    let outcome = Dispatcher::new(registry).publish(Ping { id: 2 }).wait().await;

    assert!(outcome.is_completed(), "{outcome:?}");
    let entries = trace.entries();
    assert_eq!(entries.len(), 4);
    // Both handlers arrive before either finishes.
    assert!(entries[..2].iter().all(|e| e.ends_with(":arrived")));
    assert!(entries[2..].iter().all(|e| e.ends_with(":done")));
}

#[tokio::test]
async fn test_single_failure_is_reported_unchanged() {
    let sink = FailureSink::new();
    let survivor = CountingHandler::new();
    let registry = Registry::builder()
        .command_handler::<Ping, _>(FailingHandler::new("disk full"))
        .command_handler::<Ping, _>(survivor.clone())
        .build();
    let dispatcher = Dispatcher::builder(registry)
        .on_failure(sink.callback())
        .build();

    let outcome = dispatcher.publish(Ping { id: 3 }).wait().await;

    assert_eq!(survivor.count(), 1);
    match outcome.error() {
        Some(DispatchError::Pipeline(err)) => assert_eq!(err.to_string(), "disk full"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_multiple_failures_are_aggregated() {
    let registry = Registry::builder()
        .command_handler::<Ping, _>(FailingHandler::new("first"))
        .command_handler::<Ping, _>(FailingHandler::new("second"))
        .build();

    let outcome = Dispatcher::new(registry).publish(Ping { id: 4 }).wait().await;

    match outcome.error() {
        Some(DispatchError::Aggregate(errors)) => {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            assert_eq!(messages, vec!["first", "second"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_panicking_handler_does_not_drop_siblings() {
    let sink = FailureSink::new();
    let finished = Arc::new(AtomicBool::new(false));
    let registry = Registry::builder()
        .command_handler::<Ping, _>(Detonate {
            delay: Duration::from_millis(5),
        })
        .command_handler::<Ping, _>(SlowFinisher {
            delay: Duration::from_millis(50),
            finished: Arc::clone(&finished),
        })
        .build();
    let dispatcher = Dispatcher::builder(registry)
        .on_failure(sink.callback())
        .build();

    let outcome = dispatcher.publish(Ping { id: 8 }).wait().await;

    assert!(finished.load(Ordering::SeqCst), "sibling handler was dropped");
    match outcome.error() {
        Some(DispatchError::TaskFailed(message)) => assert_eq!(message, "detonated"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_per_call_callback_overrides_default() {
    let default_sink = FailureSink::new();
    let call_sink = FailureSink::new();
    let dispatcher = Dispatcher::builder(Registry::builder().build())
        .on_failure(default_sink.callback())
        .build();

    dispatcher
        .publish_with(Orphan, PublishOptions::new().on_failure(call_sink.callback()))
        .wait()
        .await;
    dispatcher.publish(Orphan).wait().await;

    assert_eq!(call_sink.count(), 1);
    assert_eq!(default_sink.count(), 1);
}

#[tokio::test]
async fn test_publish_optional_without_command_fails_before_scheduling() {
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::new(
        Registry::builder()
            .command_handler::<Ping, _>(CountingHandler::new())
            .build(),
    );

    let result = dispatcher.publish_optional::<Ping>(
        None,
        PublishOptions::new().on_failure(sink.callback()),
    );

    match result {
        Err(DispatchError::MissingRequest { request }) => assert!(request.ends_with("Ping")),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_cancellation_before_start_runs_nothing() {
    let handler = CountingHandler::new();
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::new(
        Registry::builder()
            .command_handler::<Ping, _>(handler.clone())
            .build(),
    );
    let token = CancellationToken::new();
    token.cancel();

    let outcome = dispatcher
        .publish_with(
            Ping { id: 5 },
            PublishOptions::new()
                .cancellation(token)
                .on_failure(sink.callback()),
        )
        .wait()
        .await;

    assert!(outcome.is_cancelled());
    assert_eq!(handler.count(), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_cancellation_during_execution_is_not_a_failure() {
    let sink = FailureSink::new();
    let dispatcher = Dispatcher::new(
        Registry::builder()
            .command_handler::<Ping, _>(UntilCancelled)
            .build(),
    );
    let token = CancellationToken::new();

    let handle = dispatcher.publish_with(
        Ping { id: 6 },
        PublishOptions::new()
            .cancellation(token.clone())
            .on_failure(sink.callback()),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());
    token.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .expect("cancelled publish should finish");
    assert!(matches!(outcome, PublishOutcome::Cancelled));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_dropped_handle_still_runs_the_command() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(
        Registry::builder()
            .command_handler::<Ping, _>(handler.clone())
            .build(),
    );

    drop(dispatcher.publish(Ping { id: 7 }));

    tokio::time::timeout(Duration::from_secs(1), async {
        while handler.count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("detached publish should still run");
}
