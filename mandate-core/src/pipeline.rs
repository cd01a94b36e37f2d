//! # Pipeline composition
//!
//! One algorithm builds every behavior chain in Mandate, whatever the
//! behavior shape:
//!
//! 1. the caller fetches candidate behaviors from the resolution context,
//! 2. [`compose`] keeps those whose `should_run` accepts the request,
//! 3. sorts them by order (missing order counts as 0, ties keep registration order),
//! 4. folds them onto a terminal stage so the lowest order is outermost.
//!
//! With behaviors `B1(order 0)` and `B2(order 1)` around a handler, the
//! observable sequence is `B1 enter, B2 enter, handler, B2 exit, B1 exit`.
//!
//! The composed [`Pipeline`] is a plain function value. It is rebuilt on every
//! dispatch and never cached.

use crate::{cancel::CancellationToken, error::BoxError};
use futures::future::BoxFuture;
use std::sync::Arc;

type Stage<'a, R, T> = Arc<
    dyn Fn(&'a R, &'a CancellationToken) -> BoxFuture<'a, Result<T, BoxError>> + Send + Sync + 'a,
>;

/// A composed chain of behaviors ending in a terminal stage.
pub struct Pipeline<'a, R, T> {
    entry: Stage<'a, R, T>,
    len: usize,
}

impl<'a, R, T> Clone for Pipeline<'a, R, T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
            len: self.len,
        }
    }
}

impl<'a, R, T> Pipeline<'a, R, T>
where
    R: Sync + 'a,
    T: 'a,
{
    /// A pipeline with no behaviors, calling `stage` directly.
    pub fn terminal<F>(stage: F) -> Self
    where
        F: Fn(&'a R, &'a CancellationToken) -> BoxFuture<'a, Result<T, BoxError>>
            + Send
            + Sync
            + 'a,
    {
        Self {
            entry: Arc::new(stage),
            len: 0,
        }
    }

    /// Number of behaviors in the chain, including those of wrapped pipelines.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain consists of the terminal stage only.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Execute the whole chain once.
    pub fn run(
        &self,
        request: &'a R,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<T, BoxError>> {
        (self.entry)(request, cancel)
    }
}

/// The remainder of a chain, handed to each behavior.
///
/// [`Next::run`] may be awaited zero, one or several times. The request and
/// cancellation token are those of the current dispatch.
pub struct Next<'a, R, T> {
    stage: Stage<'a, R, T>,
    request: &'a R,
    cancel: &'a CancellationToken,
}

impl<'a, R, T> Next<'a, R, T> {
    /// Continue down the chain.
    pub fn run(&self) -> BoxFuture<'a, Result<T, BoxError>> {
        (self.stage)(self.request, self.cancel)
    }

    /// The request travelling through the chain.
    pub fn request(&self) -> &'a R {
        self.request
    }
}

/// A behavior prepared for composition.
///
/// Implemented for each of the four behavior shapes; handler-level shapes
/// carry the handler they wrap.
pub trait Layer<'a, R, T>: Copy + Send + Sync + 'a {
    /// Precedence key; `None` counts as 0.
    fn order(&self) -> Option<i32>;

    /// Whether this behavior joins the chain for `request`.
    fn should_run(&self, request: &R) -> bool;

    /// Invoke the behavior around `next`.
    fn call(
        self,
        request: &'a R,
        next: Next<'a, R, T>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<T, BoxError>>;
}

/// Build a chain of `layers` around `terminal` for `request`.
///
/// `should_run` is evaluated here, once; excluded layers never appear in the
/// chain.
pub fn compose<'a, R, T, L, I>(
    layers: I,
    request: &R,
    terminal: Pipeline<'a, R, T>,
) -> Pipeline<'a, R, T>
where
    R: Sync + 'a,
    T: 'a,
    L: Layer<'a, R, T>,
    I: IntoIterator<Item = L>,
{
    let mut active: Vec<L> = layers
        .into_iter()
        .filter(|layer| layer.should_run(request))
        .collect();
    active.sort_by_key(|layer| layer.order().unwrap_or(0));

    let len = terminal.len + active.len();
    // Wrap from the highest order inward so the lowest order ends up outermost.
    let entry = active
        .into_iter()
        .rev()
        .fold(terminal.entry, |inner, layer| -> Stage<'a, R, T> {
            Arc::new(move |req: &'a R, cancel: &'a CancellationToken| {
                let next = Next {
                    stage: Arc::clone(&inner),
                    request: req,
                    cancel,
                };
                layer.call(req, next, cancel)
            })
        });

    Pipeline { entry, len }
}
