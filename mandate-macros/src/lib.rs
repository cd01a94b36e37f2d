//! Derive macros for Mandate request types.
//!
//! - `#[derive(Command)]` implements `Request` and `Command`
//! - `#[derive(Query)]` implements `Request` and `Query`; the response type
//!   is given with `#[query(response = T)]`
//!
//! Generated code refers to the `mandate` facade crate.

use proc_macro::TokenStream;

mod request;

/// Derive `Request` and `Command` for a type.
///
/// ```ignore
/// #[derive(Debug, Command)]
/// struct PlaceOrder {
///     sku: String,
/// }
/// ```
#[proc_macro_derive(Command)]
pub fn derive_command(input: TokenStream) -> TokenStream {
    request::derive_command_impl(input)
}

/// Derive `Request` and `Query` for a type.
///
/// ```ignore
/// #[derive(Debug, Query)]
/// #[query(response = Option<Order>)]
/// struct GetOrder {
///     id: u64,
/// }
/// ```
#[proc_macro_derive(Query, attributes(query))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    request::derive_query_impl(input)
}
