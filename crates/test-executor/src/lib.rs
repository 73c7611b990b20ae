//! A local fake executor and credential store for testing purpose.

mod preset;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chatlist_model::{
    CredentialError, CredentialResolver, RawResponse, RequestExecutor,
    TransportError, WireRequest, check_secret,
};
use tokio::time::{Instant, sleep, timeout};

pub use preset::*;

/// A fake [`RequestExecutor`] that answers from a script keyed by URL.
///
/// Before sending requests, register a [`PresetReply`] for every endpoint
/// the test will hit. Requests to unknown endpoints fail with a connection
/// error. The deadline passed to [`RequestExecutor::execute`] is honored,
/// so a reply delayed past it produces [`TransportError::Timeout`].
///
/// # Note
///
/// Clones share the script and the request log.
#[derive(Clone, Default)]
pub struct TestExecutor {
    replies: Arc<Mutex<HashMap<String, PresetReply>>>,
    requests: Arc<Mutex<Vec<WireRequest>>>,
}

impl TestExecutor {
    /// Registers the reply for an endpoint, replacing any previous one.
    #[inline]
    pub fn add_reply<S: Into<String>>(&mut self, url: S, reply: PresetReply) {
        match self.replies.lock() {
            Ok(mut replies) => replies.insert(url.into(), reply),
            Err(poisoned) => poisoned.into_inner().insert(url.into(), reply),
        };
    }

    /// Returns every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<WireRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, req: &WireRequest) {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(req.clone()),
            Err(poisoned) => poisoned.into_inner().push(req.clone()),
        }
    }
}

impl RequestExecutor for TestExecutor {
    fn execute(
        &self,
        req: WireRequest,
        deadline: Duration,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'static
    {
        self.record(&req);
        let reply = match self.replies.lock() {
            Ok(replies) => replies.get(&req.url).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&req.url).cloned(),
        };
        async move {
            let Some(reply) = reply else {
                return Err(TransportError::Connect(format!(
                    "no preset reply for {}",
                    req.url
                )));
            };

            let started = Instant::now();
            if timeout(deadline, sleep(reply.delay())).await.is_err() {
                return Err(TransportError::Timeout(deadline));
            }

            let (status, body) = match reply.outcome {
                PresetOutcome::Reply { status, body } => {
                    let body = serde_json::to_vec(&body).map_err(|err| {
                        TransportError::Other(format!("{err}"))
                    })?;
                    (status, Bytes::from(body))
                }
                PresetOutcome::Raw(body) => (200, Bytes::from(body)),
                PresetOutcome::ConnectError(reason) => {
                    return Err(TransportError::Connect(reason));
                }
            };
            if !(200..300).contains(&status) {
                return Err(TransportError::Status {
                    status,
                    message: String::from_utf8_lossy(&body).into_owned(),
                });
            }
            Ok(RawResponse {
                status,
                body,
                duration: started.elapsed(),
            })
        }
    }
}

/// An in-memory [`CredentialResolver`].
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    secrets: HashMap<String, String>,
}

impl StaticCredentials {
    /// Registers a secret under a reference.
    #[inline]
    pub fn with_secret<K: Into<String>, V: Into<String>>(
        mut self,
        reference: K,
        secret: V,
    ) -> Self {
        self.secrets.insert(reference.into(), secret.into());
        self
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, reference: &str) -> Result<String, CredentialError> {
        check_secret(reference, self.secrets.get(reference).cloned())
    }
}
