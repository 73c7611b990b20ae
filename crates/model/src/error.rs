use std::time::Duration;

use thiserror::Error;

/// The kind of a transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The deadline expired before the response was fully received.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The provider answered with a non-success status code.
    Status,
    /// The request could not be built, e.g. an illegal header value.
    InvalidRequest,
    /// The response body could not be read.
    Body,
    /// Any other errors.
    Other,
}

/// A failure of the transport layer while performing one request.
///
/// Executors return this type instead of panicking, so the dispatcher can
/// turn it into a failed outcome for the affected provider only.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The whole call did not finish within the deadline.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// A short description extracted from the response body.
        message: String,
    },
    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
    /// Any other transport failure.
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connect(_) => ErrorKind::Connect,
            TransportError::Status { .. } => ErrorKind::Status,
            TransportError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            TransportError::Body(_) => ErrorKind::Body,
            TransportError::Other(_) => ErrorKind::Other,
        }
    }
}

/// An error returned when a credential reference cannot be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// No secret is registered under the reference.
    #[error("credential `{0}` is not set")]
    Unset(String),
    /// The secret exists but is blank.
    #[error("credential `{0}` is empty")]
    Empty(String),
}

/// An error returned when a provider's response body is not usable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("malformed response: {0}")]
pub struct ParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = TransportError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_credential_message_names_reference() {
        let err = CredentialError::Unset("OPENAI_API_KEY".to_owned());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
