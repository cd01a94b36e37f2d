//! Built-in query handler selectors.
//!
//! Both rely on the default mark set by
//! [`RegistryBuilder::default_query_handler`](crate::registry::RegistryBuilder::default_query_handler).

use mandate_core::{Query, QueryCandidate, QueryHandlerSelector};

/// Picks the single candidate marked as default.
///
/// Makes no choice when no candidate, or more than one, carries the mark.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandlerSelector;

impl<Q: Query> QueryHandlerSelector<Q> for DefaultHandlerSelector {
    fn select<'c>(
        &self,
        _query: &Q,
        candidates: &'c [QueryCandidate<Q>],
    ) -> Option<&'c QueryCandidate<Q>> {
        let mut defaults = candidates.iter().filter(|candidate| candidate.is_default());
        match (defaults.next(), defaults.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// Picks the first candidate marked as default, else the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFirstSelector;

impl<Q: Query> QueryHandlerSelector<Q> for DefaultFirstSelector {
    fn select<'c>(
        &self,
        _query: &Q,
        candidates: &'c [QueryCandidate<Q>],
    ) -> Option<&'c QueryCandidate<Q>> {
        candidates
            .iter()
            .find(|candidate| candidate.is_default())
            .or_else(|| candidates.first())
    }
}
