//! Handler selection for queries.
//!
//! A query must resolve to exactly one handler before any behavior runs.
//! [`select_query_handler`] applies the escalation rules:
//!
//! - one candidate is used directly, selectors are not consulted;
//! - several candidates require exactly one registered [`QueryHandlerSelector`];
//! - a selector that picks nothing leaves the ambiguity unresolved.

use crate::{
    context::QueryCandidate,
    error::DispatchError,
    request::Query,
};
use std::{any::type_name, sync::Arc};

/// Chooses one handler among several candidates for a query type.
pub trait QueryHandlerSelector<Q: Query>: Send + Sync + 'static {
    /// Pick one of `candidates`, or `None` to leave the choice unresolved.
    fn select<'c>(
        &self,
        query: &Q,
        candidates: &'c [QueryCandidate<Q>],
    ) -> Option<&'c QueryCandidate<Q>>;
}

/// Resolve the single handler for `query`.
///
/// `selectors` is only called when more than one candidate exists.
pub fn select_query_handler<'c, Q, S>(
    query: &Q,
    candidates: &'c [QueryCandidate<Q>],
    selectors: S,
) -> Result<&'c QueryCandidate<Q>, DispatchError>
where
    Q: Query,
    S: FnOnce() -> Vec<Arc<dyn QueryHandlerSelector<Q>>>,
{
    let request = type_name::<Q>();
    let count = candidates.len();

    match candidates {
        [] => Err(DispatchError::NoHandlerRegistered { request }),
        [only] => Ok(only),
        _ => match selectors().as_slice() {
            [] => Err(DispatchError::NoHandlerSelectorRegistered { request, count }),
            [selector] => selector
                .select(query, candidates)
                .ok_or(DispatchError::MultipleQueryHandlersRegistered { request, count }),
            many => Err(DispatchError::MultipleSelectorsRegistered {
                request,
                count: many.len(),
            }),
        },
    }
}
