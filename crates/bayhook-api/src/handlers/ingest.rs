//! Webhook ingestion handler.
//!
//! Parses the authenticated request body, builds the fixed-shape row and
//! hands it to the warehouse. The warehouse outcome is mapped to the HTTP
//! response here; nothing is retried or queued. An insert that outlives
//! `REQUEST_TIMEOUT` is abandoned and reported as an upstream failure.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bayhook_core::{build_row, parse_payload, OutputRow};
use bayhook_warehouse::{InsertOutcome, Warehouse, WarehouseError};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{error::IngestError, AppState};

/// Message returned when the row was written.
pub const SUCCESS_MESSAGE: &str = "Row inserted into BigQuery";

/// Response from a successful insert.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Human-readable confirmation
    pub success: &'static str,
}

/// Ingests one webhook delivery as one warehouse row.
///
/// # Errors
///
/// Responds with:
/// - 400: Body is not JSON or decodes to an empty value
/// - 500: Warehouse rejected the row, could not be reached, or did not
///   answer within `REQUEST_TIMEOUT`
#[instrument(
    name = "ingest_webhook",
    skip(state, body),
    fields(
        content_length = body.len(),
        destination = %state.warehouse.destination(),
    )
)]
pub async fn ingest_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    info!("Processing webhook ingestion request");

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed payload");
            return IngestError::from(e).into_response();
        },
    };

    let row = build_row(&payload, state.clock.as_ref());
    debug!(columns = row.len(), "Built output row");

    let outcome = tokio::time::timeout(state.request_timeout, insert(state.warehouse.as_ref(), row))
        .await
        .unwrap_or_else(|_| {
            error!(timeout = ?state.request_timeout, "Warehouse insert timed out");
            Err(IngestError::Upstream(WarehouseError::timeout(state.request_timeout.as_secs())))
        });

    match outcome {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Inserts `row` and classifies the outcome.
///
/// # Errors
///
/// Returns `IngestError::Rejected` when the warehouse refused the row and
/// `IngestError::Upstream` when the call did not complete.
pub async fn insert(warehouse: &dyn Warehouse, row: OutputRow) -> Result<IngestResponse, IngestError> {
    match warehouse.insert_row(&row).await {
        Ok(InsertOutcome::Inserted { rows }) => {
            info!(rows, "Row inserted");
            Ok(IngestResponse { success: SUCCESS_MESSAGE })
        },
        Ok(InsertOutcome::Rejected { errors }) => {
            error!(
                error_count = errors.len(),
                first_reason = errors.first().map_or("unknown", |e| e.reason.as_str()),
                "Warehouse rejected row"
            );
            Err(IngestError::Rejected { errors, row })
        },
        Err(e) => {
            error!(error = %e, "Warehouse request failed");
            Err(IngestError::Upstream(e))
        },
    }
}
