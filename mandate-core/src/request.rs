//! Request taxonomy.
//!
//! Every request is either a [`Command`] or a [`Query`], never both. The split
//! is enforced through [`Request::Kind`]: a type has exactly one `Request`
//! impl, so it carries exactly one kind.

mod sealed {
    pub trait Sealed {}
}

/// Marker for the two request categories. Sealed.
pub trait RequestKind: sealed::Sealed + Send + Sync + 'static {}

/// Kind tag for side-effecting requests without a return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {}

/// Kind tag for requests producing exactly one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {}

impl sealed::Sealed for CommandKind {}
impl sealed::Sealed for QueryKind {}
impl RequestKind for CommandKind {}
impl RequestKind for QueryKind {}

/// An immutable value routed by its concrete type.
///
/// Implement this together with [`Command`] or [`Query`]; the
/// `#[derive(Command)]` and `#[derive(Query)]` macros write both impls.
///
/// # Example
///
/// ```rust
/// use mandate_core::{Command, CommandKind, Request};
///
/// struct Shutdown;
///
/// impl Request for Shutdown {
///     type Kind = CommandKind;
/// }
/// impl Command for Shutdown {}
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Request",
    label = "must implement `Request` with a `Kind`",
    note = "Requests must be `Send + Sync + 'static` and declare whether they are a command or a query."
)]
pub trait Request: Send + Sync + 'static {
    /// Either [`CommandKind`] or [`QueryKind`].
    type Kind: RequestKind;
}

/// A request that mutates state and produces no value.
pub trait Command: Request<Kind = CommandKind> {}

/// A request that produces exactly one [`Query::Response`].
pub trait Query: Request<Kind = QueryKind> {
    /// The value a handler produces for this query.
    type Response: Send + 'static;
}
