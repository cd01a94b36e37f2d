//! Error types for Mandate.
//!
//! - [`DispatchError`] - everything `publish` and `send` can fail with
//! - [`BoxError`] - opaque errors raised by handlers and behaviors
//!
//! Resolution failures carry the name of the request type they concern.

use crate::cancel::Cancelled;
use std::any::type_name;
use thiserror::Error;

/// A boxed error type for handler and behavior failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while resolving or executing a dispatch.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No handler is registered for the request type.
    #[error("no handler registered for request type {request}")]
    NoHandlerRegistered {
        /// Request type name.
        request: &'static str,
    },

    /// Several query handlers matched but no selector is registered.
    #[error("{count} handlers registered for request type {request} but no handler selector")]
    NoHandlerSelectorRegistered {
        /// Request type name.
        request: &'static str,
        /// Number of candidate handlers.
        count: usize,
    },

    /// More than one selector is registered for the query type.
    #[error("{count} handler selectors registered for request type {request}, expected at most one")]
    MultipleSelectorsRegistered {
        /// Request type name.
        request: &'static str,
        /// Number of selectors found.
        count: usize,
    },

    /// The selector made no choice among several candidates.
    #[error("{count} handlers registered for request type {request} and the selector chose none")]
    MultipleQueryHandlersRegistered {
        /// Request type name.
        request: &'static str,
        /// Number of candidate handlers.
        count: usize,
    },

    /// The caller supplied no request.
    #[error("no request supplied for request type {request}")]
    MissingRequest {
        /// Request type name.
        request: &'static str,
    },

    /// Several fanned-out command handlers failed.
    #[error("{} command handlers failed", .0.len())]
    Aggregate(Vec<BoxError>),

    /// A behavior or handler failed; the error is passed through unchanged.
    #[error(transparent)]
    Pipeline(BoxError),

    /// The background unit of work for a published command panicked or was aborted.
    #[error("dispatch task failed: {0}")]
    TaskFailed(String),
}

impl DispatchError {
    /// `NoHandlerRegistered` for `R`.
    pub fn no_handler<R: ?Sized>() -> Self {
        DispatchError::NoHandlerRegistered {
            request: type_name::<R>(),
        }
    }

    /// `MissingRequest` for `R`.
    pub fn missing_request<R: ?Sized>() -> Self {
        DispatchError::MissingRequest {
            request: type_name::<R>(),
        }
    }

    /// Turn an error that crossed a pipeline boundary back into a `DispatchError`.
    ///
    /// Errors that already are `DispatchError`s are unboxed; anything else
    /// becomes [`DispatchError::Pipeline`].
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<DispatchError>() {
            Ok(dispatch) => *dispatch,
            Err(other) => DispatchError::Pipeline(other),
        }
    }

    /// Build the error for a set of failed fan-out branches.
    ///
    /// A single failure is returned as is.
    pub fn from_failures(mut failures: Vec<BoxError>) -> Option<BoxError> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(Box::new(DispatchError::Aggregate(failures))),
        }
    }

    /// The request type this error concerns, for resolution failures.
    pub fn request_type(&self) -> Option<&'static str> {
        match self {
            DispatchError::NoHandlerRegistered { request }
            | DispatchError::NoHandlerSelectorRegistered { request, .. }
            | DispatchError::MultipleSelectorsRegistered { request, .. }
            | DispatchError::MultipleQueryHandlersRegistered { request, .. }
            | DispatchError::MissingRequest { request } => Some(*request),
            _ => None,
        }
    }

    /// Whether this failure is a cancellation rather than a fault.
    ///
    /// Aggregates count as cancellation only when every branch was cancelled.
    pub fn is_cancellation(&self) -> bool {
        match self {
            DispatchError::Pipeline(err) => is_cancellation(err.as_ref()),
            DispatchError::Aggregate(errs) => {
                !errs.is_empty() && errs.iter().all(|e| is_cancellation(e.as_ref()))
            }
            _ => false,
        }
    }
}

impl From<BoxError> for DispatchError {
    fn from(err: BoxError) -> Self {
        DispatchError::from_boxed(err)
    }
}

impl From<Cancelled> for DispatchError {
    fn from(err: Cancelled) -> Self {
        DispatchError::Pipeline(Box::new(err))
    }
}

/// Whether `err` is a [`Cancelled`], directly or wrapped in a [`DispatchError`].
pub fn is_cancellation(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    if err.is::<Cancelled>() {
        return true;
    }
    err.downcast_ref::<DispatchError>()
        .is_some_and(DispatchError::is_cancellation)
}
