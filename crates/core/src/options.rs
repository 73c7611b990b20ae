//! Per-submission settings.

use std::time::Duration;

use chatlist_model::{ProviderConfig, RequestParams};

/// Deadline used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builder for [`DispatchOptions`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DispatchOptionsBuilder {
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    max_concurrency: Option<usize>,
}

impl DispatchOptionsBuilder {
    /// Creates a builder with every setting at its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request deadline. Zero keeps the default.
    #[inline]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = (secs > 0).then_some(secs);
        self
    }

    /// Caps the length of generated answers, in tokens.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Bounds how many requests of one batch are in flight at once.
    /// Values below one are raised to one.
    #[inline]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Builds the options.
    #[inline]
    pub fn build(self) -> DispatchOptions {
        DispatchOptions {
            timeout: Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_tokens: self.max_tokens,
            max_concurrency: self.max_concurrency,
        }
    }
}

/// Settings passed along with one submission.
///
/// By default requests get a 30 second deadline, answers are not capped and
/// every provider of a batch is contacted at once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DispatchOptions {
    pub(crate) timeout: Duration,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) max_concurrency: Option<usize>,
}

impl DispatchOptions {
    /// Returns the per-request deadline.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the answer length cap.
    #[inline]
    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Returns the concurrency bound, `None` meaning unbounded.
    #[inline]
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    pub(crate) fn request_params(&self, config: &ProviderConfig) -> RequestParams {
        RequestParams {
            model: config.model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for DispatchOptions {
    #[inline]
    fn default() -> Self {
        DispatchOptionsBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DispatchOptions::default();
        assert_eq!(options.timeout(), Duration::from_secs(30));
        assert_eq!(options.max_tokens(), None);
        assert_eq!(options.max_concurrency(), None);
    }

    #[test]
    fn test_builder() {
        let options = DispatchOptionsBuilder::new()
            .with_timeout_secs(0)
            .with_max_tokens(512)
            .with_max_concurrency(0)
            .build();
        assert_eq!(options.timeout(), Duration::from_secs(30));
        assert_eq!(options.max_tokens(), Some(512));
        assert_eq!(options.max_concurrency(), Some(1));
    }
}
