//! `Command` and `Query` derives.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Type, parse_macro_input};

/// Implementation of `#[derive(Command)]`.
pub fn derive_command_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let request = request_impl(&input, quote!(::mandate::CommandKind));
    let expanded = quote! {
        #request

        impl #impl_generics ::mandate::Command for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Implementation of `#[derive(Query)]`.
pub fn derive_query_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let response = match response_type(&input) {
        Ok(response) => response,
        Err(err) => return err.to_compile_error().into(),
    };

    let request = request_impl(&input, quote!(::mandate::QueryKind));
    let expanded = quote! {
        #request

        impl #impl_generics ::mandate::Query for #name #ty_generics #where_clause {
            type Response = #response;
        }
    };

    TokenStream::from(expanded)
}

fn request_impl(input: &DeriveInput, kind: TokenStream2) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::mandate::Request for #name #ty_generics #where_clause {
            type Kind = #kind;
        }
    }
}

/// Read `T` from `#[query(response = T)]`.
fn response_type(input: &DeriveInput) -> syn::Result<Type> {
    let mut response = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("query")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("response") {
                if response.is_some() {
                    return Err(meta.error("duplicate `response` argument"));
                }
                response = Some(meta.value()?.parse::<Type>()?);
                Ok(())
            } else {
                Err(meta.error("unknown query attribute, expected `response`"))
            }
        })?;
    }

    response.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "missing `#[query(response = ...)]` attribute on query type",
        )
    })
}
