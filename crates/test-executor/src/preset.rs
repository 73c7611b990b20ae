use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// What the fake endpoint does once the delay has passed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetOutcome {
    /// Answer with a status code and a JSON body.
    #[serde(rename = "reply")]
    Reply {
        /// The HTTP status code.
        status: u16,
        /// The JSON body.
        body: Value,
    },
    /// Answer with a body that is not JSON.
    #[serde(rename = "raw")]
    Raw(String),
    /// Fail as if the host were unreachable.
    #[serde(rename = "connect_error")]
    ConnectError(String),
}

/// The scripted behavior of one fake endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetReply {
    /// What to answer.
    pub outcome: PresetOutcome,
    /// How long to wait before answering, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

impl PresetReply {
    /// A `200 OK` reply with the given body.
    #[inline]
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    /// A reply with an arbitrary status.
    #[inline]
    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            outcome: PresetOutcome::Reply { status, body },
            delay_ms: 0,
        }
    }

    /// A `200 OK` reply whose body is not JSON.
    #[inline]
    pub fn raw<S: Into<String>>(body: S) -> Self {
        Self {
            outcome: PresetOutcome::Raw(body.into()),
            delay_ms: 0,
        }
    }

    /// A connection failure.
    #[inline]
    pub fn connect_error<S: Into<String>>(reason: S) -> Self {
        Self {
            outcome: PresetOutcome::ConnectError(reason.into()),
            delay_ms: 0,
        }
    }

    /// A chat-completions answer carrying `text` and a token count.
    pub fn chat_text(text: &str, total_tokens: u64) -> Self {
        Self::ok(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }],
            "usage": {"total_tokens": total_tokens}
        }))
    }

    /// A message-style answer carrying `text`.
    pub fn message_text(text: &str) -> Self {
        Self::ok(json!({
            "id": "msg_test",
            "type": "message",
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 5, "output_tokens": 7}
        }))
    }

    /// Delays the answer.
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the configured delay.
    #[inline]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let reply = PresetReply::chat_text("Hello", 3)
            .with_delay(Duration::from_millis(20));

        let serialized = serde_json::to_string(&reply).unwrap();
        let deserialized: PresetReply =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(reply, deserialized);
        assert_eq!(deserialized.delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_delay_saturates() {
        let reply = PresetReply::raw("").with_delay(Duration::MAX);
        assert_eq!(reply.delay_ms, u64::MAX);
    }

    #[test]
    fn test_delay_defaults_to_zero() {
        let reply: PresetReply = serde_json::from_value(json!({
            "outcome": {"type": "connect_error", "data": "refused"}
        }))
        .unwrap();
        assert_eq!(reply.delay(), Duration::ZERO);
    }
}
