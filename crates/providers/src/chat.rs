//! Adapters for the chat-completions family.
//!
//! The four kinds share one body and response schema and differ only in
//! their default model, extra headers and where the reported model name
//! comes from.

use chatlist_model::{
    ParseError, ParsedResponse, ProviderKind, RequestParams, WireRequest,
};

use crate::Adapter;
use crate::proto::{ChatCompletion, ChatCompletionRequest, Message};

const TEMPERATURE: f64 = 0.7;

struct Flavor {
    kind: ProviderKind,
    /// Model sent when the configuration doesn't name one. `None` omits
    /// the field entirely.
    default_model: Option<&'static str>,
    /// Model reported when nothing else is known.
    reported_model: &'static str,
    extra_headers: &'static [(&'static str, &'static str)],
    /// Prefer the model named in the response over the requested one.
    model_from_response: bool,
}

const OPENAI: Flavor = Flavor {
    kind: ProviderKind::OpenAI,
    default_model: Some("gpt-3.5-turbo"),
    reported_model: "gpt-3.5-turbo",
    extra_headers: &[],
    model_from_response: false,
};

const DEEPSEEK: Flavor = Flavor {
    kind: ProviderKind::DeepSeek,
    default_model: Some("deepseek-chat"),
    reported_model: "deepseek-chat",
    extra_headers: &[],
    model_from_response: false,
};

const GROQ: Flavor = Flavor {
    kind: ProviderKind::Groq,
    default_model: None,
    reported_model: "groq",
    extra_headers: &[],
    model_from_response: false,
};

const OPENROUTER: Flavor = Flavor {
    kind: ProviderKind::OpenRouter,
    default_model: Some("openai/gpt-3.5-turbo"),
    reported_model: "openai/gpt-3.5-turbo",
    extra_headers: &[
        ("HTTP-Referer", "https://github.com/chatlist"),
        ("X-Title", "ChatList"),
    ],
    model_from_response: true,
};

impl Flavor {
    fn requested_model(&self, params: &RequestParams) -> Option<String> {
        params
            .model
            .clone()
            .or_else(|| self.default_model.map(str::to_owned))
    }

    fn build_request(
        &self,
        prompt: &str,
        credential: &str,
        endpoint: &str,
        params: &RequestParams,
    ) -> WireRequest {
        let body = ChatCompletionRequest {
            model: self.requested_model(params),
            messages: vec![Message::user(prompt)],
            temperature: TEMPERATURE,
            max_tokens: params.max_tokens,
        };
        let body = serde_json::to_value(&body).unwrap_or_default();
        let mut req = WireRequest::new(endpoint, body)
            .with_header("Authorization", format!("Bearer {credential}"))
            .with_header("Content-Type", "application/json");
        for (name, value) in self.extra_headers {
            req = req.with_header(*name, *value);
        }
        req
    }

    fn parse_response(
        &self,
        status: u16,
        body: &[u8],
        params: &RequestParams,
    ) -> Result<ParsedResponse, ParseError> {
        check_status(status)?;
        let completion: ChatCompletion = serde_json::from_slice(body)
            .map_err(|err| ParseError(format!("{err}")))?;
        trace!("parsed {} completion: {completion:?}", self.kind);

        let tokens_used = completion.usage.as_ref().and_then(|u| u.total_tokens);
        let requested = self
            .requested_model(params)
            .unwrap_or_else(|| self.reported_model.to_owned());
        let model_used = match (&completion.model, self.model_from_response) {
            (Some(model), true) => model.clone(),
            _ => requested,
        };
        Ok(ParsedResponse {
            text: completion.into_text(),
            tokens_used,
            model_used: Some(model_used),
        })
    }
}

pub(crate) fn check_status(status: u16) -> Result<(), ParseError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ParseError(format!("unexpected status {status}")))
    }
}

macro_rules! chat_adapter {
    ($(#[$meta:meta])* $name:ident => $flavor:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name;

        impl Adapter for $name {
            #[inline]
            fn kind(&self) -> ProviderKind {
                $flavor.kind
            }

            #[inline]
            fn build_request(
                &self,
                prompt: &str,
                credential: &str,
                endpoint: &str,
                params: &RequestParams,
            ) -> WireRequest {
                $flavor.build_request(prompt, credential, endpoint, params)
            }

            #[inline]
            fn parse_response(
                &self,
                status: u16,
                body: &[u8],
                params: &RequestParams,
            ) -> Result<ParsedResponse, ParseError> {
                $flavor.parse_response(status, body, params)
            }
        }
    };
}

chat_adapter! {
    /// Adapter for the generic chat-completions API.
    OpenAIAdapter => OPENAI
}

chat_adapter! {
    /// Adapter for DeepSeek's chat-completions API.
    DeepSeekAdapter => DEEPSEEK
}

chat_adapter! {
    /// Adapter for Groq's chat-completions API.
    GroqAdapter => GROQ
}

chat_adapter! {
    /// Adapter for OpenRouter, which forwards to an upstream model.
    OpenRouterAdapter => OPENROUTER
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ENDPOINT: &str = "https://api.example.com/v1/chat/completions";

    fn completion_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "chatcmpl-123",
            "model": "meta-llama/llama-3-8b",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello there"},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 9,
                "completion_tokens": 12,
                "total_tokens": 21
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_openai_request() {
        let req = OpenAIAdapter.build_request(
            "Hello",
            "sk-test",
            ENDPOINT,
            &RequestParams::default(),
        );
        assert_eq!(req.url, ENDPOINT);
        assert_eq!(req.header("Authorization"), Some("Bearer sk-test"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(
            req.body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.7
            })
        );
    }

    #[test]
    fn test_params_override_defaults() {
        let params = RequestParams {
            model: Some("deepseek-reasoner".to_owned()),
            max_tokens: Some(256),
        };
        let req = DeepSeekAdapter.build_request("Hi", "k", ENDPOINT, &params);
        assert_eq!(req.body["model"], "deepseek-reasoner");
        assert_eq!(req.body["max_tokens"], 256);
    }

    #[test]
    fn test_groq_omits_model() {
        let req = GroqAdapter.build_request(
            "Hi",
            "k",
            ENDPOINT,
            &RequestParams::default(),
        );
        assert!(req.body.get("model").is_none());

        let parsed = GroqAdapter
            .parse_response(200, &completion_body(), &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.model_used.as_deref(), Some("groq"));
        assert_eq!(parsed.tokens_used, Some(21));
    }

    #[test]
    fn test_openrouter_headers_and_model() {
        let req = OpenRouterAdapter.build_request(
            "Hi",
            "k",
            ENDPOINT,
            &RequestParams::default(),
        );
        assert_eq!(req.header("X-Title"), Some("ChatList"));
        assert!(req.header("HTTP-Referer").is_some());

        let parsed = OpenRouterAdapter
            .parse_response(200, &completion_body(), &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.text, "Hello there");
        assert_eq!(parsed.model_used.as_deref(), Some("meta-llama/llama-3-8b"));
    }

    #[test]
    fn test_openai_reports_requested_model() {
        let parsed = OpenAIAdapter
            .parse_response(200, &completion_body(), &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.model_used.as_deref(), Some("gpt-3.5-turbo"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let parsed = OpenAIAdapter
            .parse_response(200, b"{}", &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.tokens_used, None);

        let body = br#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let parsed = DeepSeekAdapter
            .parse_response(200, body, &RequestParams::default())
            .unwrap();
        assert_eq!(parsed.text, "ok");
        assert_eq!(parsed.tokens_used, None);
    }

    #[test]
    fn test_malformed_body() {
        let err = OpenAIAdapter
            .parse_response(200, b"<html>", &RequestParams::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("malformed response"));

        let err = OpenAIAdapter
            .parse_response(502, b"{}", &RequestParams::default())
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
