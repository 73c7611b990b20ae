//! The list of configured providers.

use std::fs;
use std::path::{Path, PathBuf};

use chatlist_model::{ProviderConfig, ProviderId};
use thiserror::Error;

/// Errors while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The catalog path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The content is not a JSON array of provider configurations.
    #[error("invalid provider catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Every provider the user has configured, enabled or not.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    providers: Vec<ProviderConfig>,
}

/// Reads a catalog from a JSON file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_owned(),
        source,
    })?;
    let catalog = Catalog::from_json(&content)?;
    debug!(
        "loaded {} provider(s) from {}",
        catalog.providers.len(),
        path.display()
    );
    Ok(catalog)
}

impl Catalog {
    /// Creates a catalog from configurations.
    #[inline]
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }

    /// Parses a JSON array of provider configurations.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let providers = serde_json::from_str(json)?;
        Ok(Self { providers })
    }

    /// Returns every configured provider.
    #[inline]
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Returns the enabled providers, in catalog order.
    pub fn enabled(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect()
    }

    /// Returns the enabled providers whose id is in `ids`, in catalog order.
    pub fn select(&self, ids: &[ProviderId]) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .filter(|p| p.enabled && ids.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Looks up a provider by id.
    pub fn get(&self, id: &ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| &p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": 1,
            "name": "GPT",
            "url": "https://api.openai.com/v1/chat/completions",
            "credential": "OPENAI_API_KEY",
            "kind": "openai"
        },
        {
            "id": "claude",
            "name": "Claude",
            "url": "https://api.anthropic.com/v1/messages",
            "credential": "ANTHROPIC_API_KEY",
            "kind": "anthropic",
            "model": "claude-3-haiku-20240307"
        },
        {
            "id": 3,
            "name": "Groq",
            "url": "https://api.groq.com/openai/v1/chat/completions",
            "credential": "GROQ_API_KEY",
            "kind": "groq",
            "enabled": false
        }
    ]"#;

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.providers().len(), 3);

        let claude = catalog.get(&ProviderId::from("claude")).unwrap();
        assert_eq!(claude.model.as_deref(), Some("claude-3-haiku-20240307"));
        assert!(claude.enabled);
    }

    #[test]
    fn test_enabled_and_select() {
        let catalog = Catalog::from_json(CATALOG).unwrap();

        let enabled: Vec<_> =
            catalog.enabled().into_iter().map(|p| p.name).collect();
        assert_eq!(enabled, ["GPT", "Claude"]);

        let selected = catalog.select(&[
            ProviderId::from("3"),
            ProviderId::from("claude"),
        ]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Claude");
    }

    #[test]
    fn test_load_errors() {
        let err = load("/nonexistent/providers.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(err.to_string().starts_with("failed to read"));

        let err = Catalog::from_json(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
