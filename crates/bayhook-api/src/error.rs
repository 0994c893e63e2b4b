//! Errors raised while ingesting an authenticated webhook.
//!
//! Each variant maps to one HTTP status and a JSON body with an `error`
//! message. Authentication failures are handled separately by
//! `AuthError` before the handler runs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bayhook_core::{CoreError, OutputRow};
use bayhook_warehouse::{RowError, WarehouseError};
use serde_json::{json, Value};
use thiserror::Error;

/// Failures of the ingest pipeline after authentication.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The body was not JSON, or decoded to an empty value.
    #[error("Invalid JSON")]
    InvalidJson(#[from] CoreError),

    /// The warehouse processed the insert and refused the row.
    #[error("Failed to insert row: {}", join_errors(.errors))]
    Rejected {
        /// Diagnostics reported by the warehouse
        errors: Vec<RowError>,
        /// The row that was submitted
        row: OutputRow,
    },

    /// The insert could not be completed.
    #[error("Warehouse request failed: {0}")]
    Upstream(#[from] WarehouseError),
}

impl IngestError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { .. } | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body returned to the caller.
    pub fn body(&self) -> Value {
        match self {
            Self::Rejected { errors, row } => json!({
                "error": self.to_string(),
                "details": errors,
                "row": row,
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

fn join_errors(errors: &[RowError]) -> String {
    if errors.is_empty() {
        return "rejected without details".to_string();
    }
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection() -> IngestError {
        let mut row = OutputRow::new();
        row.insert("bay", json!("3"));

        IngestError::Rejected {
            errors: vec![RowError {
                index: 0,
                reason: "invalid".to_string(),
                location: "bay".to_string(),
                message: "no such field: bay.".to_string(),
            }],
            row,
        }
    }

    #[test]
    fn invalid_json_is_bad_request() {
        let err = IngestError::from(CoreError::EmptyPayload);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({"error": "Invalid JSON"}));
    }

    #[test]
    fn rejection_body_carries_details_and_row() {
        let err = rejection();
        let body = err.body();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Failed to insert row: row 0: invalid at bay (no such field: bay.)"
        );
        assert_eq!(body["details"][0]["index"], 0);
        assert_eq!(body["details"][0]["reason"], "invalid");
        assert_eq!(body["row"]["bay"], "3");
    }

    #[test]
    fn rejection_without_details_still_describes_failure() {
        let err = IngestError::Rejected { errors: vec![], row: OutputRow::new() };
        assert_eq!(err.to_string(), "Failed to insert row: rejected without details");
    }

    #[test]
    fn upstream_error_embeds_message() {
        let err = IngestError::from(WarehouseError::timeout(30));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.body(),
            json!({"error": "Warehouse request failed: request timeout after 30s"})
        );
    }
}
