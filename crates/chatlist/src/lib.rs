//! Ask many chat providers the same question and compare their answers.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring side-by-side comparisons into your own host
//! apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod catalog;
mod comparison;
pub mod improver;

pub use catalog::{Catalog, CatalogError};
pub use comparison::{CompareError, Comparison, ComparisonBuilder};

/// Re-exports of [`chatlist_core`] crate.
pub mod core {
    pub use chatlist_core::*;
}

/// Re-exports of [`chatlist_model`] crate.
pub mod model {
    pub use chatlist_model::*;
}
