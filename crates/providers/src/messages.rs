use chatlist_model::{
    ParseError, ParsedResponse, ProviderKind, RequestParams, WireRequest,
};

use crate::Adapter;
use crate::chat::check_status;
use crate::proto::{Message, MessagesRequest, MessagesResponse};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Adapter for the message-style API, authenticated by a key header and
/// pinned to an API version.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    fn model(params: &RequestParams) -> String {
        params
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned())
    }
}

impl Adapter for AnthropicAdapter {
    #[inline]
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build_request(
        &self,
        prompt: &str,
        credential: &str,
        endpoint: &str,
        params: &RequestParams,
    ) -> WireRequest {
        let body = MessagesRequest {
            model: Self::model(params),
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![Message::user(prompt)],
        };
        let body = serde_json::to_value(&body).unwrap_or_default();
        WireRequest::new(endpoint, body)
            .with_header("x-api-key", credential)
            .with_header("anthropic-version", API_VERSION)
            .with_header("Content-Type", "application/json")
    }

    fn parse_response(
        &self,
        status: u16,
        body: &[u8],
        params: &RequestParams,
    ) -> Result<ParsedResponse, ParseError> {
        check_status(status)?;
        let resp: MessagesResponse = serde_json::from_slice(body)
            .map_err(|err| ParseError(format!("{err}")))?;
        trace!("parsed messages response: {resp:?}");

        let tokens_used = resp.usage.as_ref().and_then(|u| u.total());
        let text = resp
            .content
            .and_then(|blocks| blocks.into_iter().next())
            .and_then(|block| block.text)
            .unwrap_or_default();
        Ok(ParsedResponse {
            text,
            tokens_used,
            model_used: Some(Self::model(params)),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_request() {
        let req = AnthropicAdapter.build_request(
            "Hello",
            "sk-ant",
            "https://api.anthropic.com/v1/messages",
            &RequestParams::default(),
        );
        assert_eq!(req.header("x-api-key"), Some("sk-ant"));
        assert_eq!(req.header("anthropic-version"), Some("2023-06-01"));
        assert_eq!(req.header("Authorization"), None);
        assert_eq!(
            req.body,
            json!({
                "model": "claude-3-sonnet-20240229",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "Hello"}]
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let body = serde_json::to_vec(&json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Bonjour"}],
            "usage": {"input_tokens": 10, "output_tokens": 25}
        }))
        .unwrap();
        let parsed = AnthropicAdapter
            .parse_response(200, &body, &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.text, "Bonjour");
        assert_eq!(parsed.tokens_used, Some(35));
        assert_eq!(
            parsed.model_used.as_deref(),
            Some("claude-3-sonnet-20240229")
        );
    }

    #[test]
    fn test_parse_empty_content() {
        let parsed = AnthropicAdapter
            .parse_response(200, br#"{"content": []}"#, &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.tokens_used, None);
    }
}
