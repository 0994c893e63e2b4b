//! Configuration management for the bayhook service.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use bayhook_warehouse::{token::DEFAULT_METADATA_URL, BigQueryConfig, TableRef, DEFAULT_API_URL};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthStrategy;

const CONFIG_FILE: &str = "config.toml";

/// Environment variables read verbatim rather than through figment's value
/// parser, which would turn `007` into the integer `7`.
const VERBATIM_ENV: &[&str] =
    &["ALLOWED_IP", "ALLOWED_TOKEN", "PROJECT_ID", "DATASET_ID", "TABLE_ID", "BIGQUERY_ACCESS_TOKEN"];

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// The caller secret (`ALLOWED_IP` or `ALLOWED_TOKEN`) is not
/// validated here. A deployment without it still starts and answers every
/// webhook with 500 until the secret is provided.
///
/// # Example
///
/// ```no_run
/// use bayhook_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Writing to {}", config.table());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port. Serverless platforms inject this.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// Deadline for the warehouse insert of one webhook, in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Authentication
    /// Which caller check this deployment performs.
    ///
    /// Environment variable: `AUTH_STRATEGY` (`ip` or `token`)
    #[serde(default, alias = "AUTH_STRATEGY")]
    pub auth_strategy: AuthStrategy,
    /// The single client IP allowed to call the `ip` strategy.
    ///
    /// Environment variable: `ALLOWED_IP`
    #[serde(default, alias = "ALLOWED_IP")]
    pub allowed_ip: Option<String>,
    /// The token expected by the `token` strategy.
    ///
    /// Environment variable: `ALLOWED_TOKEN`
    #[serde(default, alias = "ALLOWED_TOKEN", skip_serializing)]
    pub allowed_token: Option<String>,

    // Destination
    /// Google Cloud project holding the dataset.
    ///
    /// Environment variable: `PROJECT_ID`
    #[serde(default, alias = "PROJECT_ID")]
    pub project_id: String,
    /// BigQuery dataset ID.
    ///
    /// Environment variable: `DATASET_ID`
    #[serde(default, alias = "DATASET_ID")]
    pub dataset_id: String,
    /// BigQuery table ID.
    ///
    /// Environment variable: `TABLE_ID`
    #[serde(default, alias = "TABLE_ID")]
    pub table_id: String,

    // Warehouse client
    /// BigQuery REST API base URL.
    ///
    /// Environment variable: `BIGQUERY_API_URL`
    #[serde(default = "default_api_url", alias = "BIGQUERY_API_URL")]
    pub bigquery_api_url: String,
    /// Pre-issued access token. When unset, tokens come from the metadata
    /// server.
    ///
    /// Environment variable: `BIGQUERY_ACCESS_TOKEN`
    #[serde(default, alias = "BIGQUERY_ACCESS_TOKEN", skip_serializing)]
    pub bigquery_access_token: Option<String>,
    /// Metadata server base URL.
    ///
    /// Environment variable: `METADATA_URL`
    #[serde(default = "default_metadata_url", alias = "METADATA_URL")]
    pub metadata_url: String,
    /// Timeout for warehouse and metadata requests in seconds.
    ///
    /// Environment variable: `WAREHOUSE_TIMEOUT_SECONDS`
    #[serde(default = "default_warehouse_timeout", alias = "WAREHOUSE_TIMEOUT_SECONDS")]
    pub warehouse_timeout_seconds: u64,

    // Logging
    /// Log filter used when `RUST_LOG` is not set at startup.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or the result does not validate.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("").ignore(VERBATIM_ENV));

        let mut config: Self = figment.extract().context("Failed to load configuration")?;
        config.apply_verbatim_env();

        config.validate()?;
        Ok(config)
    }

    fn apply_verbatim_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok();

        if let Some(value) = var("ALLOWED_IP") {
            self.allowed_ip = Some(value);
        }
        if let Some(value) = var("ALLOWED_TOKEN") {
            self.allowed_token = Some(value);
        }
        if let Some(value) = var("PROJECT_ID") {
            self.project_id = value;
        }
        if let Some(value) = var("DATASET_ID") {
            self.dataset_id = value;
        }
        if let Some(value) = var("TABLE_ID") {
            self.table_id = value;
        }
        if let Some(value) = var("BIGQUERY_ACCESS_TOKEN") {
            self.bigquery_access_token = Some(value);
        }
    }

    /// The secret for the active strategy, or `None` if unset or empty.
    pub fn auth_secret(&self) -> Option<&str> {
        let secret = match self.auth_strategy {
            AuthStrategy::Ip => self.allowed_ip.as_deref(),
            AuthStrategy::Token => self.allowed_token.as_deref(),
        };
        secret.filter(|s| !s.is_empty())
    }

    /// Destination table.
    pub fn table(&self) -> TableRef {
        TableRef::new(&self.project_id, &self.dataset_id, &self.table_id)
    }

    /// Convert to the warehouse client's configuration.
    pub fn to_bigquery_config(&self) -> BigQueryConfig {
        BigQueryConfig {
            api_url: self.bigquery_api_url.clone(),
            table: self.table(),
            timeout: self.warehouse_timeout(),
            ..Default::default()
        }
    }

    /// Access token to use instead of the metadata server, if one is set.
    pub fn static_access_token(&self) -> Option<&str> {
        self.bigquery_access_token.as_deref().filter(|s| !s.is_empty())
    }

    /// Timeout for outbound warehouse calls.
    pub fn warehouse_timeout(&self) -> Duration {
        Duration::from_secs(self.warehouse_timeout_seconds)
    }

    /// Deadline for the warehouse insert of one inbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.warehouse_timeout_seconds == 0 {
            anyhow::bail!("warehouse_timeout_seconds must be greater than 0");
        }

        for (name, value) in [
            ("PROJECT_ID", &self.project_id),
            ("DATASET_ID", &self.dataset_id),
            ("TABLE_ID", &self.table_id),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{name} must be set");
            }
        }

        if self.bigquery_api_url.is_empty() {
            anyhow::bail!("bigquery_api_url must not be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            auth_strategy: AuthStrategy::default(),
            allowed_ip: None,
            allowed_token: None,
            project_id: String::new(),
            dataset_id: String::new(),
            table_id: String::new(),
            bigquery_api_url: default_api_url(),
            bigquery_access_token: None,
            metadata_url: default_metadata_url(),
            warehouse_timeout_seconds: default_warehouse_timeout(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_warehouse_timeout() -> u64 {
    bayhook_warehouse::DEFAULT_TIMEOUT_SECONDS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    fn with_destination(jail: &mut Jail) {
        jail.set_env("PROJECT_ID", "proj");
        jail.set_env("DATASET_ID", "parking");
        jail.set_env("TABLE_ID", "events");
    }

    #[test]
    fn defaults_without_destination_fail_validation() {
        let config = Config::default();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PROJECT_ID"));
    }

    #[test]
    fn loads_from_environment() {
        Jail::expect_with(|jail| {
            with_destination(jail);
            jail.set_env("PORT", "9090");
            jail.set_env("AUTH_STRATEGY", "ip");
            jail.set_env("ALLOWED_IP", "203.0.113.7");
            jail.set_env("WAREHOUSE_TIMEOUT_SECONDS", "5");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.port, 9090);
            assert_eq!(config.auth_strategy, AuthStrategy::Ip);
            assert_eq!(config.auth_secret(), Some("203.0.113.7"));
            assert_eq!(config.table().to_string(), "proj.parking.events");
            assert_eq!(config.warehouse_timeout(), Duration::from_secs(5));
            Ok(())
        });
    }

    #[test]
    fn numeric_looking_secrets_are_kept_verbatim() {
        Jail::expect_with(|jail| {
            with_destination(jail);
            jail.set_env("PROJECT_ID", "0042");
            jail.set_env("ALLOWED_TOKEN", "007");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.auth_strategy, AuthStrategy::Token);
            assert_eq!(config.auth_secret(), Some("007"));
            assert_eq!(config.project_id, "0042");
            Ok(())
        });
    }

    #[test]
    fn config_file_is_overridden_by_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                port = 7000
                auth_strategy = "ip"
                allowed_ip = "10.0.0.1"
                project_id = "file-project"
                dataset_id = "file-dataset"
                table_id = "file-table"
                "#,
            )?;
            jail.set_env("PORT", "7001");
            jail.set_env("ALLOWED_IP", "10.0.0.2");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.port, 7001);
            assert_eq!(config.auth_secret(), Some("10.0.0.2"));
            assert_eq!(config.project_id, "file-project");
            Ok(())
        });
    }

    #[test]
    fn missing_secret_is_not_a_load_error() {
        Jail::expect_with(|jail| {
            with_destination(jail);
            jail.set_env("AUTH_STRATEGY", "token");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.auth_secret(), None);
            Ok(())
        });
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let config = Config {
            auth_strategy: AuthStrategy::Ip,
            allowed_ip: Some(String::new()),
            allowed_token: Some("unused".to_string()),
            ..Config::default()
        };

        assert_eq!(config.auth_secret(), None);
    }

    #[test]
    fn invalid_strategy_fails_to_load() {
        Jail::expect_with(|jail| {
            with_destination(jail);
            jail.set_env("AUTH_STRATEGY", "password");

            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn invalid_config_validation_fails() {
        let valid = Config {
            project_id: "p".to_string(),
            dataset_id: "d".to_string(),
            table_id: "t".to_string(),
            ..Config::default()
        };
        assert!(valid.validate().is_ok());

        let mut config = valid.clone();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = valid.clone();
        config.warehouse_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid;
        config.table_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = Config {
            allowed_token: Some("super-secret".to_string()),
            bigquery_access_token: Some("ya29.secret".to_string()),
            ..Config::default()
        };

        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("ya29.secret"));
    }

    #[test]
    fn bigquery_config_conversion() {
        let config = Config {
            project_id: "p".to_string(),
            dataset_id: "d".to_string(),
            table_id: "t".to_string(),
            bigquery_api_url: "http://localhost:9050".to_string(),
            warehouse_timeout_seconds: 12,
            ..Config::default()
        };

        let bq = config.to_bigquery_config();
        assert_eq!(bq.api_url, "http://localhost:9050");
        assert_eq!(bq.table, TableRef::new("p", "d", "t"));
        assert_eq!(bq.timeout, Duration::from_secs(12));
    }

    #[test]
    fn socket_address_parsing() {
        let config = Config { host: "127.0.0.1".to_string(), port: 9000, ..Config::default() };

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
