//! Error types for warehouse operations.
//!
//! Covers every way an insert can fail to complete: token acquisition,
//! transport failures, non-success HTTP statuses and unreadable responses.
//! Row-level rejections are not errors; see `InsertOutcome`.

use thiserror::Error;

/// Result type alias for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;

/// Errors that prevent an insert from completing.
#[derive(Debug, Clone, Error)]
pub enum WarehouseError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// Request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// The API answered with a non-success status.
    #[error("warehouse API returned HTTP {status_code}: {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// The API answered 2xx but the body could not be decoded.
    #[error("invalid warehouse response: {message}")]
    InvalidResponse {
        /// Decoding error message
        message: String,
    },

    /// No access token could be obtained.
    #[error("access token unavailable: {message}")]
    TokenUnavailable {
        /// Reason the token could not be obtained
        message: String,
    },

    /// Client could not be constructed from the given settings.
    #[error("invalid warehouse configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl WarehouseError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates an API error from an HTTP response.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api { status_code, message: message.into() }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a token error.
    pub fn token(message: impl Into<String>) -> Self {
        Self::TokenUnavailable { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Maps a reqwest transport error, classifying timeouts.
    pub(crate) fn from_transport(err: &reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            return Self::timeout(timeout_seconds);
        }
        if err.is_connect() {
            return Self::network(format!("connection failed: {err}"));
        }
        Self::network(err.to_string())
    }
}
