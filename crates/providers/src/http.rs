use std::time::Duration;

use bytes::Bytes;
use chatlist_model::{
    RawResponse, RequestExecutor, TransportError, WireRequest,
};
use reqwest::Client;
use serde_json::Value;
use tokio::time::{Instant, timeout};

/// Longest body excerpt kept in a status error.
const MAX_ERROR_EXCERPT: usize = 200;

/// A [`RequestExecutor`] backed by a pooled `reqwest` client.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Creates an executor with a default client.
    #[inline]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates an executor around an existing client.
    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpExecutor {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RequestExecutor for HttpExecutor {
    fn execute(
        &self,
        req: WireRequest,
        deadline: Duration,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'static
    {
        trace!("executing {req:?}");
        let mut builder = self.client.post(&req.url).timeout(deadline);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let builder = builder.json(&req.body);

        async move {
            let started = Instant::now();
            let work = async {
                let resp = builder
                    .send()
                    .await
                    .map_err(|err| map_error(err, deadline))?;
                let status = resp.status();
                let body = resp
                    .bytes()
                    .await
                    .map_err(|err| map_error(err, deadline))?;
                if !status.is_success() {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        message: describe_error_body(&body),
                    });
                }
                Ok(RawResponse {
                    status: status.as_u16(),
                    body,
                    duration: started.elapsed(),
                })
            };
            // The client enforces the same deadline, this also covers
            // reading the body.
            match timeout(deadline, work).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(deadline)),
            }
        }
    }
}

fn map_error(err: reqwest::Error, deadline: Duration) -> TransportError {
    debug!("request error: {err:?}");
    if err.is_timeout() {
        TransportError::Timeout(deadline)
    } else if err.is_builder() {
        TransportError::InvalidRequest(format!("{err}"))
    } else if err.is_connect() {
        TransportError::Connect(format!("{err}"))
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(format!("{err}"))
    } else {
        TransportError::Other(format!("{err}"))
    }
}

/// Extracts a short description from an error response body.
///
/// Providers usually answer with `{"error": {"message": ...}}`, some with
/// `{"error": "..."}` or `{"message": ...}`. Anything else is reported as
/// a truncated excerpt of the raw body.
pub(crate) fn describe_error_body(body: &Bytes) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_owned();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_owned();
    }
    match text.char_indices().nth(MAX_ERROR_EXCERPT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_error_body() {
        let body = Bytes::from_static(
            br#"{"error": {"message": "Invalid API key", "type": "auth"}}"#,
        );
        assert_eq!(describe_error_body(&body), "Invalid API key");

        let body = Bytes::from_static(br#"{"error": "model overloaded"}"#);
        assert_eq!(describe_error_body(&body), "model overloaded");

        let body = Bytes::from_static(b"  Bad Gateway  ");
        assert_eq!(describe_error_body(&body), "Bad Gateway");

        assert_eq!(describe_error_body(&Bytes::new()), "empty response body");

        let long = Bytes::from("x".repeat(500));
        let described = describe_error_body(&long);
        assert_eq!(described.len(), MAX_ERROR_EXCERPT + 3);
    }
}
