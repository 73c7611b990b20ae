//! The shared vocabulary for dispatching one prompt to many chat-completion
//! providers.
//!
//! This crate establishes the types that flow between the provider adapters,
//! the request executor and the dispatcher: provider configurations, wire
//! requests, raw and normalized responses, and the typed errors each stage
//! may produce.
//!
//! Types in this crate don't perform any network activity. Traits such as
//! [`RequestExecutor`] and [`CredentialResolver`] are the seams that the
//! other crates implement or consume.

#![deny(missing_docs)]

mod credential;
mod error;
mod executor;
mod provider;
mod request;
mod response;

pub use credential::*;
pub use error::*;
pub use executor::*;
pub use provider::*;
pub use request::*;
pub use response::*;
