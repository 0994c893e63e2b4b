//! Caller authentication for webhook requests.
//!
//! Each deployment runs exactly one strategy, both with the same shape:
//! resolve the credential the caller presented, compare it to a single
//! configured secret, and reject on absence or any mismatch. Comparison is
//! exact and case-sensitive.
//!
//! If the secret for the active strategy is not configured, every request
//! fails with a configuration error before the credential is examined.
//!
//! # Client IP resolution
//!
//! The `ip` strategy trusts the first entry of `X-Forwarded-For`, taken
//! verbatim: no whitespace trimming or address normalization, so
//! `" 203.0.113.7"` does not match `203.0.113.7`. When that entry is missing,
//! empty or `"0"` it falls back to the TCP peer address, which behind a
//! serverless front-end or load balancer is the proxy, not the caller. That
//! fallback is kept for direct deployments but should not be relied on.

use std::{fmt, net::SocketAddr};

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::config::Config;

/// Header carrying the proxy chain of client addresses.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Scheme prefix expected in the `Authorization` header.
pub const TOKEN_SCHEME_PREFIX: &str = "Token ";

/// Credential reported when neither the header nor the peer address is
/// available.
const UNKNOWN_CLIENT: &str = "unknown";

/// How callers prove they may deliver webhooks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Caller IP must equal `ALLOWED_IP`.
    Ip,
    /// `Authorization: Token <value>` must carry `ALLOWED_TOKEN`.
    #[default]
    Token,
}

impl AuthStrategy {
    /// Name of the environment variable holding this strategy's secret.
    pub const fn secret_variable(self) -> &'static str {
        match self {
            Self::Ip => "ALLOWED_IP",
            Self::Token => "ALLOWED_TOKEN",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Token => write!(f, "token"),
        }
    }
}

/// Proof that a request passed authentication.
///
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    /// Loggable identity of the caller: the client IP, or `token` for the
    /// token strategy.
    pub principal: String,
}

/// Reasons a request is refused before reaching the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The active strategy has no secret configured.
    MissingSecret {
        /// Environment variable that must be set
        variable: &'static str,
    },
    /// The presented credential is absent or does not match.
    Denied {
        /// Message returned to the caller and logged
        reason: String,
    },
}

impl AuthError {
    fn denied(reason: impl Into<String>) -> Self {
        Self::Denied { reason: reason.into() }
    }

    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingSecret { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Denied { .. } => StatusCode::FORBIDDEN,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret { variable } => write!(f, "Missing {variable} environment variable"),
            Self::Denied { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Checks callers against the deployment's single configured secret.
#[derive(Clone)]
pub struct Authenticator {
    strategy: AuthStrategy,
    secret: Option<String>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("strategy", &self.strategy)
            .field("secret_configured", &self.secret.is_some())
            .finish()
    }
}

impl Authenticator {
    /// Creates an authenticator. An empty secret counts as unset.
    pub fn new(strategy: AuthStrategy, secret: Option<String>) -> Self {
        Self { strategy, secret: secret.filter(|s| !s.is_empty()) }
    }

    /// Creates the authenticator described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.auth_strategy, config.auth_secret().map(String::from))
    }

    /// The active strategy.
    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    /// Whether the active strategy's secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Decides whether a request may proceed.
    ///
    /// `peer` is the transport-level remote address, if known.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingSecret` when no secret is configured,
    /// without looking at the request, and `AuthError::Denied` when the
    /// credential is absent or wrong.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Result<Authorized, AuthError> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(AuthError::MissingSecret { variable: self.strategy.secret_variable() });
        };

        match self.strategy {
            AuthStrategy::Ip => {
                let client_ip = client_ip(headers, peer);
                if client_ip != secret {
                    return Err(AuthError::denied(format!(
                        "Request from unauthorized IP: {client_ip}"
                    )));
                }
                Ok(Authorized { principal: client_ip })
            },
            AuthStrategy::Token => {
                let header = headers
                    .get(AUTHORIZATION)
                    .ok_or_else(|| AuthError::denied("Request unauthorized: missing Authorization header"))?;

                let token = header.to_str().ok().and_then(extract_token).ok_or_else(|| {
                    AuthError::denied("Request unauthorized: malformed Authorization header")
                })?;

                if !constant_time_eq(token, secret) {
                    return Err(AuthError::denied("Request unauthorized: invalid token"));
                }
                Ok(Authorized { principal: "token".to_string() })
            },
        }
    }
}

/// Resolves the caller's IP address.
///
/// Uses the first comma-separated entry of `X-Forwarded-For` as presented,
/// falling back to `peer`, then to `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .filter(|ip| !ip.is_empty() && *ip != "0");

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    match peer {
        Some(addr) => {
            warn!(peer = %addr, "X-Forwarded-For missing, falling back to peer address");
            addr.ip().to_string()
        },
        None => UNKNOWN_CLIENT.to_string(),
    }
}

/// Extracts the token from an `Authorization` header value of the form
/// `Token <value>`.
fn extract_token(header: &str) -> Option<&str> {
    header.strip_prefix(TOKEN_SCHEME_PREFIX).filter(|token| !token.is_empty())
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
