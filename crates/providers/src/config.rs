use std::time::Duration;

use reqwest::Client;

use crate::HttpExecutor;

const DEFAULT_USER_AGENT: &str =
    concat!("chatlist/", env!("CARGO_PKG_VERSION"));

/// Builder for [`HttpExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpExecutorBuilder {
    user_agent: Option<String>,
    connect_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl HttpExecutorBuilder {
    /// Creates a builder with default settings.
    #[inline]
    pub fn new() -> Self {
        Self {
            user_agent: None,
            connect_timeout: None,
            pool_max_idle_per_host: None,
        }
    }

    /// Sets the `User-Agent` header sent with every request.
    #[inline]
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Bounds the connect phase separately from the per-request deadline.
    #[inline]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Limits idle pooled connections kept per host.
    #[inline]
    pub fn with_pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Builds the executor.
    pub fn build(self) -> Result<HttpExecutor, reqwest::Error> {
        let mut builder = Client::builder().user_agent(
            self.user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        );
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        Ok(HttpExecutor::with_client(builder.build()?))
    }
}

impl Default for HttpExecutorBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
