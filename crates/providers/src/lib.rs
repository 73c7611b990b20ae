//! Provider adapters and the HTTP executor.
//!
//! Every supported [`ProviderKind`] has one [`Adapter`] that knows how the
//! provider authenticates, what body it expects and where its answer lives in
//! the response. [`adapter_for`] is the single lookup from kind to adapter.
//! [`HttpExecutor`] performs the resulting requests.

#[macro_use]
extern crate tracing;

mod chat;
mod config;
mod http;
mod messages;
mod proto;

use chatlist_model::{
    ParseError, ParsedResponse, ProviderKind, RequestParams, WireRequest,
};

pub use chat::{DeepSeekAdapter, GroqAdapter, OpenAIAdapter, OpenRouterAdapter};
pub use config::HttpExecutorBuilder;
pub use http::HttpExecutor;
pub use messages::AnthropicAdapter;

/// Translation between a normalized prompt and one provider's wire format.
///
/// The header shapes, body schemas and response paths are constants of each
/// implementation. Adapters hold no state and never touch the network.
pub trait Adapter: Send + Sync + 'static {
    /// Returns the kind this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Builds a ready-to-send request.
    fn build_request(
        &self,
        prompt: &str,
        credential: &str,
        endpoint: &str,
        params: &RequestParams,
    ) -> WireRequest;

    /// Extracts the answer text, token usage and model from a response.
    ///
    /// Missing optional blocks yield empty text or absent usage. Only a body
    /// that cannot be decoded at all is an error.
    fn parse_response(
        &self,
        status: u16,
        body: &[u8],
        params: &RequestParams,
    ) -> Result<ParsedResponse, ParseError>;
}

/// Returns the adapter for a kind.
pub fn adapter_for(kind: ProviderKind) -> &'static dyn Adapter {
    match kind {
        ProviderKind::OpenAI => &OpenAIAdapter,
        ProviderKind::DeepSeek => &DeepSeekAdapter,
        ProviderKind::Groq => &GroqAdapter,
        ProviderKind::Anthropic => &AnthropicAdapter,
        ProviderKind::OpenRouter => &OpenRouterAdapter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_for_every_kind() {
        for kind in ProviderKind::ALL {
            assert_eq!(adapter_for(kind).kind(), kind);
        }
    }
}
