//! BigQuery `insertAll` client.
//!
//! Sends one row per call to
//! `{api_url}/projects/{project}/datasets/{dataset}/tables/{table}/insertAll`
//! and turns the response into an `InsertOutcome`. A 2xx response may still
//! carry `insertErrors`; those become `InsertOutcome::Rejected` with one
//! `RowError` per reported problem.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use bayhook_core::OutputRow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    error::{Result, WarehouseError},
    outcome::{InsertOutcome, RowError},
    token::TokenSource,
    Warehouse, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECONDS,
};

/// Fully qualified destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Google Cloud project ID
    pub project_id: String,
    /// BigQuery dataset ID
    pub dataset_id: String,
    /// BigQuery table ID
    pub table_id: String,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Path of the `insertAll` method for this table, relative to the API
    /// base URL.
    pub fn insert_all_path(&self) -> String {
        format!(
            "/projects/{}/datasets/{}/tables/{}/insertAll",
            self.project_id, self.dataset_id, self.table_id
        )
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Configuration for the BigQuery client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigQueryConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Destination table.
    pub table: TableRef,
    /// Timeout for each insert request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            table: TableRef::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            user_agent: format!("bayhook/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Warehouse implementation backed by the BigQuery REST API.
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: reqwest::Client,
    config: BigQueryConfig,
    insert_url: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRequest<'a> {
    kind: &'static str,
    rows: Vec<InsertAllRow<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRow<'a> {
    insert_id: String,
    json: &'a OutputRow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Debug, Deserialize)]
struct InsertErrors {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl BigQueryClient {
    /// Creates a client for the configured table.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: BigQueryConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| WarehouseError::configuration(format!("failed to build HTTP client: {e}")))?;

        let insert_url =
            format!("{}{}", config.api_url.trim_end_matches('/'), config.table.insert_all_path());

        Ok(Self { client, config, insert_url, tokens })
    }

    /// Returns the URL rows are posted to.
    pub fn insert_url(&self) -> &str {
        &self.insert_url
    }

    async fn send(&self, row: &OutputRow) -> Result<InsertOutcome> {
        let token = self.tokens.access_token().await?;

        let request = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            rows: vec![InsertAllRow { insert_id: Uuid::new_v4().to_string(), json: row }],
        };

        let response = self
            .client
            .post(&self.insert_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Insert request failed: {}", e);
                WarehouseError::from_transport(&e, self.config.timeout.as_secs())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WarehouseError::network(format!("failed to read response body: {e}")))?;

        debug!(status = status.as_u16(), "Received insertAll response");

        if !status.is_success() {
            return Err(WarehouseError::api(status.as_u16(), api_error_message(&body)));
        }

        parse_insert_response(&body, request.rows.len())
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn insert_row(&self, row: &OutputRow) -> Result<InsertOutcome> {
        let span = info_span!("warehouse_insert", table = %self.config.table);
        self.send(row).instrument(span).await
    }

    fn destination(&self) -> String {
        self.config.table.to_string()
    }
}

/// Interprets a successful `insertAll` body.
fn parse_insert_response(body: &str, submitted: usize) -> Result<InsertOutcome> {
    let response: InsertAllResponse = if body.trim().is_empty() {
        InsertAllResponse::default()
    } else {
        serde_json::from_str(body).map_err(|e| WarehouseError::invalid_response(e.to_string()))?
    };

    if response.insert_errors.is_empty() {
        return Ok(InsertOutcome::Inserted { rows: submitted });
    }

    let errors = response
        .insert_errors
        .into_iter()
        .flat_map(|entry| {
            let index = entry.index;
            let protos = if entry.errors.is_empty() {
                vec![ErrorProto { reason: "unknown".to_string(), ..Default::default() }]
            } else {
                entry.errors
            };
            protos.into_iter().map(move |proto| RowError {
                index,
                reason: proto.reason,
                location: proto.location,
                message: proto.message,
            })
        })
        .collect();

    Ok(InsertOutcome::Rejected { errors })
}

/// Pulls the message out of a Google API error body, falling back to the
/// raw body.
fn api_error_message(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 1024;

    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.chars().take(MAX_BODY_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_all_path_includes_all_identifiers() {
        let table = TableRef::new("proj", "parking", "events");

        assert_eq!(table.insert_all_path(), "/projects/proj/datasets/parking/tables/events/insertAll");
        assert_eq!(table.to_string(), "proj.parking.events");
    }

    #[test]
    fn trailing_slash_in_api_url_is_ignored() {
        let config = BigQueryConfig {
            api_url: "http://localhost:9050/bigquery/v2/".to_string(),
            table: TableRef::new("p", "d", "t"),
            ..Default::default()
        };
        let client =
            BigQueryClient::new(config, Arc::new(crate::StaticToken::new("token"))).unwrap();

        assert_eq!(
            client.insert_url(),
            "http://localhost:9050/bigquery/v2/projects/p/datasets/d/tables/t/insertAll"
        );
    }

    #[test]
    fn response_without_errors_is_inserted() {
        let body = r#"{"kind": "bigquery#tableDataInsertAllResponse"}"#;

        assert_eq!(parse_insert_response(body, 1).unwrap(), InsertOutcome::Inserted { rows: 1 });
        assert_eq!(parse_insert_response("", 1).unwrap(), InsertOutcome::Inserted { rows: 1 });
    }

    #[test]
    fn insert_errors_are_flattened() {
        let body = r#"{
            "kind": "bigquery#tableDataInsertAllResponse",
            "insertErrors": [
                {"index": 0, "errors": [
                    {"reason": "invalid", "location": "bay", "message": "no such field: bay."},
                    {"reason": "stopped", "location": "", "message": ""}
                ]}
            ]
        }"#;

        let InsertOutcome::Rejected { errors } = parse_insert_response(body, 1).unwrap() else {
            panic!("expected rejection");
        };

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 0);
        assert_eq!(errors[0].reason, "invalid");
        assert_eq!(errors[0].location, "bay");
        assert_eq!(errors[1].reason, "stopped");
    }

    #[test]
    fn insert_error_without_details_is_unknown() {
        let body = r#"{"insertErrors": [{"index": 0}]}"#;

        let InsertOutcome::Rejected { errors } = parse_insert_response(body, 1).unwrap() else {
            panic!("expected rejection");
        };

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, "unknown");
    }

    #[test]
    fn undecodable_body_is_invalid_response() {
        let err = parse_insert_response("<html>", 1).unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidResponse { .. }));
    }

    #[test]
    fn api_error_message_prefers_google_error_body() {
        let body = r#"{"error": {"code": 404, "message": "Not found: Table p:d.t", "status": "NOT_FOUND"}}"#;

        assert_eq!(api_error_message(body), "Not found: Table p:d.t");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }
}
