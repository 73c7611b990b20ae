//! Concurrent dispatch of one prompt to many chat providers, and the
//! aggregation of their outcomes into batches.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod batch;
mod dispatcher;
mod event;
mod executor_client;
mod options;

pub use batch::{
    Batch, BatchId, BatchState, BatchSummary, RecordError, ResultRecord,
};
pub use dispatcher::{
    BatchHandle, Dispatcher, DispatcherBuilder, DispatcherClosed, SubmitError,
};
pub use event::DispatchEvent;
pub use options::{DEFAULT_TIMEOUT_SECS, DispatchOptions, DispatchOptionsBuilder};
