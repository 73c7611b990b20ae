use std::time::Duration;

use bytes::Bytes;
use chatlist_model::{
    ErrorKind, RawResponse, RequestExecutor, TransportError, WireRequest,
};
use serde_json::json;
use tokio::time::{sleep, timeout};

/// Answers every request with its own body, or fails for unknown hosts.
struct EchoExecutor {
    delay: Duration,
}

impl RequestExecutor for EchoExecutor {
    fn execute(
        &self,
        req: WireRequest,
        deadline: Duration,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'static
    {
        let delay = self.delay;
        async move {
            if !req.url.starts_with("https://echo.test") {
                return Err(TransportError::Connect(format!(
                    "unknown host in {}",
                    req.url
                )));
            }
            let work = async {
                sleep(delay).await;
                let body = serde_json::to_vec(&req.body)
                    .map_err(|err| TransportError::Other(format!("{err}")))?;
                Ok(RawResponse {
                    status: 200,
                    body: Bytes::from(body),
                    duration: delay,
                })
            };
            match timeout(deadline, work).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(deadline)),
            }
        }
    }
}

#[tokio::test]
async fn test_echo() {
    let executor = EchoExecutor {
        delay: Duration::from_millis(1),
    };
    let req = WireRequest::new("https://echo.test/chat", json!({"q": "hi"}));
    let resp = executor
        .execute(req, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body, json!({"q": "hi"}));
}

#[tokio::test]
async fn test_errors_are_values() {
    let executor = EchoExecutor {
        delay: Duration::from_millis(50),
    };

    let req = WireRequest::new("https://elsewhere.test", json!({}));
    let err = executor.execute(req, Duration::from_secs(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connect);

    let req = WireRequest::new("https://echo.test", json!({}));
    let err = executor
        .execute(req, Duration::from_millis(5))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Timeout(Duration::from_millis(5)));
}
