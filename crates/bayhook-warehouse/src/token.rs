//! OAuth access tokens for the BigQuery API.
//!
//! On Google serverless platforms the runtime service account's token is
//! served by the instance metadata server. Outside of Google Cloud a token
//! can be supplied directly. Tokens are fetched on every insert; nothing is
//! cached between requests.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, WarehouseError};

/// Default metadata server base URL.
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Source of bearer tokens for warehouse requests.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Returns an access token valid for the BigQuery API.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError::TokenUnavailable` if no token can be
    /// obtained.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed, externally provisioned token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wraps `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"***").finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(WarehouseError::token("static token is empty"));
        }
        Ok(self.token.clone())
    }
}

/// Token for the default service account, read from the metadata server.
#[derive(Debug, Clone)]
pub struct MetadataServerToken {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
}

impl MetadataServerToken {
    /// Creates a token source for the metadata server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            WarehouseError::configuration(format!("failed to build metadata client: {e}"))
        })?;

        let url = format!("{}{TOKEN_PATH}", base_url.trim_end_matches('/'));

        Ok(Self { client, url, timeout })
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching access token from metadata server");

        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                WarehouseError::token(format!(
                    "metadata server request failed: {}",
                    WarehouseError::from_transport(&e, self.timeout.as_secs())
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WarehouseError::token(format!(
                "metadata server returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| WarehouseError::token(format!("malformed metadata response: {e}")))?;

        if body.access_token.is_empty() {
            return Err(WarehouseError::token("metadata server returned an empty token"));
        }

        Ok(body.access_token)
    }
}
