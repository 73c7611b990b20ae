use std::time::Duration;

use crate::{RawResponse, TransportError, WireRequest};

/// A type that performs one HTTP call for a [`WireRequest`].
///
/// Executors are shared by all units of a batch. Like the adapters they
/// should behave like stateless objects: no retries and no caching.
pub trait RequestExecutor: Send + Sync {
    /// Performs the request, giving up once `timeout` has elapsed.
    ///
    /// The deadline covers connecting as well as reading the whole body.
    /// Non-success statuses are reported as [`TransportError::Status`].
    /// The returned future must not borrow `self`.
    fn execute(
        &self,
        req: WireRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'static;
}
