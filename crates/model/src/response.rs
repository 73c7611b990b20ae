use std::time::Duration;

use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::ProviderId;

/// What the executor received for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The undecoded body.
    pub body: Bytes,
    /// Time from issuing the request to having read the whole body.
    pub duration: Duration,
}

/// The provider-independent fields an adapter extracts from a response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParsedResponse {
    /// The generated text, empty if the provider returned none.
    pub text: String,
    /// Total tokens used, if the provider reported usage.
    pub tokens_used: Option<u64>,
    /// The model that produced the answer, if known.
    pub model_used: Option<String>,
}

/// The normalized result of one provider call within a batch.
///
/// An outcome is either successful, carrying the response text, or failed,
/// carrying a non-empty error description. The two constructors are the only
/// way to build one, and the fields cannot be changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    provider_id: ProviderId,
    provider_name: String,
    success: bool,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_used: Option<String>,
    #[serde(rename = "response_time", serialize_with = "serialize_secs")]
    duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RequestOutcome {
    /// Creates a successful outcome.
    pub fn success(
        provider_id: ProviderId,
        provider_name: impl Into<String>,
        parsed: ParsedResponse,
        duration: Duration,
    ) -> Self {
        Self {
            provider_id,
            provider_name: provider_name.into(),
            success: true,
            text: parsed.text,
            tokens_used: parsed.tokens_used,
            model_used: parsed.model_used,
            duration,
            error: None,
        }
    }

    /// Creates a failed outcome.
    ///
    /// A blank description is replaced with `"unknown error"`, so a failed
    /// outcome always explains itself.
    pub fn failure(
        provider_id: ProviderId,
        provider_name: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_owned();
        }
        Self {
            provider_id,
            provider_name: provider_name.into(),
            success: false,
            text: String::new(),
            tokens_used: None,
            model_used: None,
            duration,
            error: Some(error),
        }
    }

    /// Returns the provider this outcome belongs to.
    #[inline]
    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Returns the provider's display name.
    #[inline]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Returns `true` if the provider answered successfully.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the response text. Empty for failures.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the token usage reported by the provider.
    #[inline]
    pub fn tokens_used(&self) -> Option<u64> {
        self.tokens_used
    }

    /// Returns the model that answered, if known.
    #[inline]
    pub fn model_used(&self) -> Option<&str> {
        self.model_used.as_deref()
    }

    /// Returns the wall-clock duration of the call.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the error description of a failed outcome.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns what should be shown in place of the response: the text on
    /// success, the error description otherwise.
    pub fn display_text(&self) -> &str {
        match &self.error {
            Some(error) => error,
            None => &self.text,
        }
    }
}

fn serialize_secs<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let secs = (duration.as_secs_f64() * 100.0).round() / 100.0;
    serializer.serialize_f64(secs)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_has_no_error() {
        let outcome = RequestOutcome::success(
            ProviderId::new("1"),
            "GPT",
            ParsedResponse {
                text: "Hi".to_owned(),
                tokens_used: Some(12),
                model_used: Some("gpt-3.5-turbo".to_owned()),
            },
            Duration::from_millis(1234),
        );
        assert!(outcome.is_success());
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.display_text(), "Hi");
    }

    #[test]
    fn test_failure_always_has_error() {
        let outcome = RequestOutcome::failure(
            ProviderId::new("1"),
            "GPT",
            "  ",
            Duration::ZERO,
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("unknown error"));
        assert_eq!(outcome.text(), "");
    }

    #[test]
    fn test_serialize() {
        let outcome = RequestOutcome::success(
            ProviderId::new("1"),
            "GPT",
            ParsedResponse {
                text: "Hi".to_owned(),
                tokens_used: Some(12),
                model_used: None,
            },
            Duration::from_millis(1234),
        );
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "provider_id": "1",
                "provider_name": "GPT",
                "success": true,
                "text": "Hi",
                "tokens_used": 12,
                "response_time": 1.23,
            })
        );
    }
}
