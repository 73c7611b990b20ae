use std::fmt::{self, Debug};

use serde_json::Value;

/// Header names whose values are never printed.
const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-api-key"];

/// A ready-to-send HTTP request produced by an adapter.
///
/// Requests are always `POST`ed with a JSON body.
#[derive(Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// The endpoint to post to.
    pub url: String,
    /// Header name and value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// The JSON body.
    pub body: Value,
}

impl WireRequest {
    /// Creates a request without headers.
    #[inline]
    pub fn new<S: Into<String>>(url: S, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: vec![],
            body,
        }
    }

    /// Appends a header.
    #[inline]
    pub fn with_header<K: Into<String>, V: Into<String>>(
        mut self,
        name: K,
        value: V,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first value of the header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<_> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let sensitive = SENSITIVE_HEADERS
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(name));
                if sensitive {
                    (name.as_str(), "<deducted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("WireRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Per-request knobs that adapters may honor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RequestParams {
    /// The model to ask for, replacing the adapter's default.
    pub model: Option<String>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
}
