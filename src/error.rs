//! Error types for the Stage1st client.

use thiserror::Error;

/// Common error type for the client.
#[derive(Error, Debug)]
pub enum S1Error {
    /// Transport-level failure (connection refused, timeout, DNS).
    ///
    /// Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The remote system explicitly throttled the request.
    ///
    /// Retryable.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Missing anti-forgery token, rejected credentials, or an
    /// unauthenticated session.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// A persisted session was found past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// Malformed input where a well-formed document was required.
    #[error("parse error: {0}")]
    Parse(String),

    /// The remote system returned a recognizable application-level rejection.
    #[error("remote rejected request: {0}")]
    Api(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Session or cache file could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Caller input rejected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),
}

impl S1Error {
    /// Whether the retry policy may re-issue the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, S1Error::Network(_) | S1Error::RateLimit(_))
    }

    /// Whether this is an authentication failure (including expiry).
    pub fn is_authentication(&self) -> bool {
        matches!(self, S1Error::Authentication(_) | S1Error::SessionExpired)
    }
}

impl From<reqwest::Error> for S1Error {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            S1Error::RateLimit(e.to_string())
        } else {
            S1Error::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for S1Error {
    fn from(e: serde_json::Error) -> Self {
        S1Error::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for S1Error {
    fn from(e: toml::ser::Error) -> Self {
        S1Error::Serialization(e.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, S1Error>;
