use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a configured provider.
///
/// Configuration stores may key providers by integer row ids or by names,
/// so both forms are accepted when deserializing.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "RawProviderId", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a provider id.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<ProviderId> for String {
    #[inline]
    fn from(value: ProviderId) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProviderId {
    Text(String),
    Number(i64),
}

impl From<RawProviderId> for ProviderId {
    fn from(raw: RawProviderId) -> Self {
        match raw {
            RawProviderId::Text(text) => Self(text),
            RawProviderId::Number(number) => Self(number.to_string()),
        }
    }
}

/// The closed set of supported provider wire formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Generic chat-completions format with bearer authentication.
    OpenAI,
    /// Chat-completions variant with a fixed default model.
    DeepSeek,
    /// Chat-completions variant that doesn't require a model field.
    Groq,
    /// Message-style format with a key header and a version header.
    Anthropic,
    /// Aggregator that routes to upstream models and reports which one
    /// answered.
    OpenRouter,
}

impl ProviderKind {
    /// Every supported kind.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAI,
        ProviderKind::DeepSeek,
        ProviderKind::Groq,
        ProviderKind::Anthropic,
        ProviderKind::OpenRouter,
    ];

    /// Looks up a kind by its configuration name, ignoring case and
    /// surrounding whitespace. Returns `None` for unknown kinds.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns the configuration name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Groq => "groq",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenRouter => "openrouter",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem with a single provider configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The display name is blank.
    #[error("provider name is missing")]
    MissingName,
    /// The endpoint URL is blank.
    #[error("provider URL is missing")]
    MissingUrl,
    /// The credential reference is blank.
    #[error("credential reference is missing")]
    MissingCredential,
    /// The kind is blank.
    #[error("provider kind is missing")]
    MissingKind,
    /// The kind is not one of [`ProviderKind::ALL`].
    #[error("unsupported provider kind")]
    UnsupportedKind,
}

fn default_enabled() -> bool {
    true
}

/// Description of one provider endpoint.
///
/// The dispatcher only ever reads configurations. The `kind` is kept as the
/// raw configured string so that an unknown kind can be reported for this
/// provider alone instead of failing to load the whole configuration set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identity of the provider.
    pub id: ProviderId,
    /// Human readable name.
    pub name: String,
    /// Endpoint the request is posted to.
    pub url: String,
    /// Opaque reference resolved by a [`crate::CredentialResolver`].
    pub credential: String,
    /// Configured provider kind, see [`ProviderKind::parse`].
    pub kind: String,
    /// Whether the provider takes part in submissions.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the adapter's default model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// Creates an enabled configuration.
    pub fn new(
        id: impl Into<ProviderId>,
        name: impl Into<String>,
        url: impl Into<String>,
        credential: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            credential: credential.into(),
            kind: kind.into(),
            enabled: true,
            model: None,
        }
    }

    /// Sets the model name.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the enabled flag.
    #[inline]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Checks the required fields and returns the parsed kind.
    ///
    /// Fields are checked in a fixed order and the first problem wins.
    /// Credentials are not resolved here.
    pub fn validate(&self) -> Result<ProviderKind, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.credential.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if self.kind.trim().is_empty() {
            return Err(ConfigError::MissingKind);
        }
        ProviderKind::parse(&self.kind).ok_or(ConfigError::UnsupportedKind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: &str) -> ProviderConfig {
        ProviderConfig::new(
            "1",
            "GPT",
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            kind,
        )
    }

    #[test]
    fn test_parse_kind_ignores_case() {
        assert_eq!(ProviderKind::parse("OpenAI"), Some(ProviderKind::OpenAI));
        assert_eq!(
            ProviderKind::parse(" openrouter "),
            Some(ProviderKind::OpenRouter)
        );
        assert_eq!(ProviderKind::parse("mistral"), None);
    }

    #[test]
    fn test_validate() {
        assert_eq!(config("groq").validate(), Ok(ProviderKind::Groq));
        assert_eq!(
            config("mistral").validate(),
            Err(ConfigError::UnsupportedKind)
        );
        assert_eq!(config("").validate(), Err(ConfigError::MissingKind));

        let mut missing_url = config("openai");
        missing_url.url = "  ".to_owned();
        assert_eq!(missing_url.validate(), Err(ConfigError::MissingUrl));
    }

    #[test]
    fn test_unsupported_kind_message() {
        assert_eq!(
            ConfigError::UnsupportedKind.to_string(),
            "unsupported provider kind"
        );
    }

    #[test]
    fn test_deserialize_numeric_id() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{
                "id": 7,
                "name": "Claude",
                "url": "https://api.anthropic.com/v1/messages",
                "credential": "ANTHROPIC_API_KEY",
                "kind": "anthropic"
            }"#,
        )
        .unwrap();
        assert_eq!(config.id.as_str(), "7");
        assert!(config.enabled);
        assert_eq!(config.model, None);
    }
}
