//! # mandate-std
//!
//! Standard implementations for the Mandate dispatch engine.
//!
//! This crate provides:
//! - **Composition root**: [`Registry`], [`RegistryBuilder`] and the per-dispatch [`Scope`]
//! - **Dispatch**: [`Dispatcher`] with `publish` for commands and `send` for queries
//! - **Selectors**: [`DefaultHandlerSelector`], [`DefaultFirstSelector`]
//! - **Standard behaviors**: logging, timeout, conditional
//! - **Type metadata**: [`meta::type_info`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use mandate_core;

pub mod behaviors;
pub mod dispatcher;
pub mod meta;
pub mod registry;
pub mod selectors;
pub mod testing;

pub use dispatcher::{
    Dispatcher, DispatcherBuilder, FailureCallback, PublishHandle, PublishOptions, PublishOutcome,
};
pub use registry::{Lifetime, Registry, RegistryBuilder, RegistrationMeta, Scope};
pub use selectors::{DefaultFirstSelector, DefaultHandlerSelector};
