use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chatlist_model::{
    RawResponse, RequestExecutor, TransportError, WireRequest,
};
use tokio::time::timeout;
use tracing::Instrument;

type ExecuteResult = Result<RawResponse, TransportError>;
type BoxedExecuteFuture = Pin<Box<dyn Future<Output = ExecuteResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(WireRequest, Duration) -> BoxedExecuteFuture + Send + Sync>;

/// A wrapper around a request executor that provides a type-erased
/// interface for the dispatcher, and holds every call to its deadline.
#[derive(Clone)]
pub(crate) struct ExecutorClient {
    handler_fn: HandlerFn,
}

impl ExecutorClient {
    #[inline]
    pub fn new<E: RequestExecutor + 'static>(executor: E) -> Self {
        // Erase `E` so that the dispatcher doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req, deadline| {
            let url = req.url.clone();
            let fut = executor.execute(req, deadline);
            Box::pin(
                async move {
                    trace!("sending a request");
                    // Executors are expected to honor the deadline on their
                    // own. This bounds the ones that don't.
                    match timeout(deadline, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(TransportError::Timeout(deadline)),
                    }
                }
                .instrument(trace_span!("executor req", url = %url)),
            )
        });
        Self { handler_fn }
    }

    /// Performs the request.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Dropping the future drops the underlying
    /// executor call.
    #[inline]
    pub async fn execute(
        &self,
        req: WireRequest,
        deadline: Duration,
    ) -> ExecuteResult {
        (self.handler_fn)(req, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use chatlist_test_executor::{PresetReply, TestExecutor};
    use serde_json::json;

    use super::*;

    const URL: &str = "https://fake.test/v1/chat/completions";

    #[tokio::test]
    async fn test_execute() {
        let mut executor = TestExecutor::default();
        executor.add_reply(URL, PresetReply::chat_text("How are you?", 5));
        let client = ExecutorClient::new(executor.clone());

        for _ in 0..3 {
            let resp = client
                .execute(WireRequest::new(URL, json!({})), Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(resp.status, 200);
        }
        assert_eq!(executor.requests().len(), 3);
    }

    /// Never answers and ignores the deadline it is given.
    struct StuckExecutor;

    impl RequestExecutor for StuckExecutor {
        fn execute(
            &self,
            _req: WireRequest,
            _deadline: Duration,
        ) -> impl Future<Output = ExecuteResult> + Send + 'static {
            std::future::pending()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_stuck_executor() {
        let client = ExecutorClient::new(StuckExecutor);
        let err = client
            .execute(WireRequest::new(URL, json!({})), Duration::from_secs(3))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_secs(3)));
    }
}
