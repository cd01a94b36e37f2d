use mandate::{
    CancellationToken, DefaultFirstSelector, DefaultHandlerSelector, DispatchError, Dispatcher,
    Registry,
    testing::{RecordingBehavior, Trace},
};
use std::sync::atomic::Ordering;

mod common;
use common::{BrokenLookup, Lookup, NamedLookup, PreferUpper, Undecided, Unanswered, UpperLookup};

#[tokio::test]
async fn test_query_without_handlers_fails_before_any_behavior() {
    let trace = Trace::new();
    let behavior = RecordingBehavior::new("outer", trace.clone());
    let registry = Registry::builder()
        .query_behavior::<Unanswered, _>(behavior.clone())
        .build();

    let err = Dispatcher::new(registry).send(Unanswered).await.unwrap_err();

    assert!(matches!(err, DispatchError::NoHandlerRegistered { .. }));
    assert_eq!(behavior.calls(), 0);
    assert!(trace.is_empty());
}

#[tokio::test]
async fn test_single_handler_needs_no_selector() {
    // Two selectors would be an error if they were consulted.
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("only"))
        .query_selector::<Lookup, _>(Undecided)
        .query_selector::<Lookup, _>(PreferUpper)
        .build();

    let answer = Dispatcher::new(registry)
        .send(Lookup { key: "k" })
        .await
        .unwrap();

    assert_eq!(answer, "only:k");
}

#[tokio::test]
async fn test_several_handlers_without_selector() {
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("a"))
        .query_handler::<Lookup, _>(UpperLookup)
        .build();

    let err = Dispatcher::new(registry)
        .send(Lookup { key: "k" })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::NoHandlerSelectorRegistered { count: 2, .. }
    ));
}

#[tokio::test]
async fn test_several_selectors_are_rejected() {
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("a"))
        .query_handler::<Lookup, _>(UpperLookup)
        .query_selector::<Lookup, _>(PreferUpper)
        .query_selector::<Lookup, _>(DefaultFirstSelector)
        .build();

    let err = Dispatcher::new(registry)
        .send(Lookup { key: "k" })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::MultipleSelectorsRegistered { count: 2, .. }
    ));
}

#[tokio::test]
async fn test_selector_without_choice_leaves_ambiguity() {
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("a"))
        .query_handler::<Lookup, _>(UpperLookup)
        .query_selector::<Lookup, _>(Undecided)
        .build();

    let err = Dispatcher::new(registry)
        .send(Lookup { key: "k" })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::MultipleQueryHandlersRegistered { count: 2, .. }
    ));
}

#[tokio::test]
async fn test_selector_choice_is_the_only_handler_invoked() {
    let named = NamedLookup::new("a");
    let calls = std::sync::Arc::clone(&named.calls);
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(named)
        .query_handler::<Lookup, _>(UpperLookup)
        .query_selector::<Lookup, _>(PreferUpper)
        .build();

    let answer = Dispatcher::new(registry)
        .send(Lookup { key: "abc" })
        .await
        .unwrap();

    assert_eq!(answer, "ABC");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_default_selectors() {
    let marked = Registry::builder()
        .query_handler::<Lookup, _>(UpperLookup)
        .default_query_handler::<Lookup, _>(NamedLookup::new("default"))
        .query_selector::<Lookup, _>(DefaultHandlerSelector)
        .build();
    let answer = Dispatcher::new(marked).send(Lookup { key: "k" }).await.unwrap();
    assert_eq!(answer, "default:k");

    let unmarked = Registry::builder()
        .query_handler::<Lookup, _>(UpperLookup)
        .query_handler::<Lookup, _>(NamedLookup::new("second"))
        .query_selector::<Lookup, _>(DefaultFirstSelector)
        .build();
    let answer = Dispatcher::new(unmarked).send(Lookup { key: "k" }).await.unwrap();
    assert_eq!(answer, "K");
}

#[tokio::test]
async fn test_handler_error_propagates_unchanged() {
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(BrokenLookup { message: "store offline" })
        .build();

    let err = Dispatcher::new(registry)
        .send(Lookup { key: "k" })
        .await
        .unwrap_err();

    match err {
        DispatchError::Pipeline(inner) => assert_eq!(inner.to_string(), "store offline"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_optional_without_query() {
    let registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("a"))
        .build();

    let err = Dispatcher::new(registry)
        .send_optional::<Lookup>(None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::MissingRequest { .. }));
}

#[tokio::test]
async fn test_nested_send_from_handler() {
    use mandate::{BoxError, QueryHandler};

    struct Outer {
        dispatcher: Dispatcher,
    }

    impl QueryHandler<Unanswered> for Outer {
        async fn handle(&self, _query: &Unanswered, cancel: &CancellationToken) -> Result<u64, BoxError> {
            let inner = self
                .dispatcher
                .send_with(Lookup { key: "nested" }, cancel)
                .await?;
            Ok(inner.len() as u64)
        }
    }

    let inner_registry = Registry::builder()
        .query_handler::<Lookup, _>(NamedLookup::new("in"))
        .build();
    let registry = Registry::builder()
        .query_handler::<Unanswered, _>(Outer {
            dispatcher: Dispatcher::new(inner_registry),
        })
        .build();

    let answer = Dispatcher::new(registry).send(Unanswered).await.unwrap();
    assert_eq!(answer, "in:nested".len() as u64);
}
