//! Error types for payload validation.
//!
//! Resolution itself never fails; the only fallible step in the core is
//! turning the raw request body into a usable payload.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for payload handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The body is not syntactically valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The body parsed, but to an empty value (`{}`, `[]`, `null`, `""`, `0`, `false`).
    #[error("Invalid JSON: payload is empty")]
    EmptyPayload,
}
