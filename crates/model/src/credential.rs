use std::env;

use crate::CredentialError;

/// Maps a credential reference to the secret it names.
pub trait CredentialResolver: Send + Sync {
    /// Returns the secret, failing when the reference is unset or empty.
    fn resolve(&self, reference: &str) -> Result<String, CredentialError>;
}

/// Resolves credential references as process environment variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvCredentialResolver;

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self, reference: &str) -> Result<String, CredentialError> {
        check_secret(reference, env::var(reference).ok())
    }
}

/// Turns a looked-up value into a resolution result.
///
/// Shared by resolvers so that unset and blank secrets are reported the
/// same way everywhere.
pub fn check_secret(
    reference: &str,
    value: Option<String>,
) -> Result<String, CredentialError> {
    match value {
        None => Err(CredentialError::Unset(reference.to_owned())),
        Some(value) if value.trim().is_empty() => {
            Err(CredentialError::Empty(reference.to_owned()))
        }
        Some(value) => Ok(value),
    }
}
