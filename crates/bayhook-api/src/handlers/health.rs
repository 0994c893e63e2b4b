//! Health check handlers for service monitoring.
//!
//! Neither endpoint calls the warehouse or the metadata server. `/health`
//! reports whether the deployment is able to accept webhooks at all, which
//! it cannot do without the active strategy's secret.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bayhook_core::Clock;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    auth::{AuthStrategy, Authenticator},
    AppState,
};

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ready to accept webhooks
    Healthy,
    /// Running, but every webhook will fail
    Degraded,
}

/// Individual component check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Caller authentication
    pub auth: AuthHealth,
    /// Destination table
    pub warehouse: WarehouseHealth,
}

/// Authentication readiness.
#[derive(Debug, Serialize)]
pub struct AuthHealth {
    /// Active strategy
    pub strategy: AuthStrategy,
    /// Whether the strategy's secret is set
    pub configured: bool,
}

/// Warehouse destination details.
#[derive(Debug, Serialize)]
pub struct WarehouseHealth {
    /// Fully qualified destination table
    pub destination: String,
}

/// Health service that encapsulates clock dependency for testable health
/// checks.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Builds the health report for the given authenticator and destination.
    pub fn health_check(&self, authenticator: &Authenticator, destination: String) -> HealthResponse {
        let configured = authenticator.is_configured();

        let status = if configured {
            HealthStatus::Healthy
        } else {
            warn!(
                variable = authenticator.strategy().secret_variable(),
                "Authentication secret missing, webhooks will fail"
            );
            HealthStatus::Degraded
        };

        HealthResponse {
            status,
            timestamp: self.clock.now(),
            checks: HealthChecks {
                auth: AuthHealth { strategy: authenticator.strategy(), configured },
                warehouse: WarehouseHealth { destination },
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
///
/// Always answers 200 while the process is serving; a missing secret is
/// reported as `degraded` in the body.
#[instrument(name = "health_check", skip(app_state))]
pub async fn health_check(State(app_state): State<AppState>) -> Response {
    let health_service = HealthService::new(app_state.clock.clone());
    let response =
        health_service.health_check(&app_state.authenticator, app_state.warehouse.destination());

    debug!(status = ?response.status, "Health check completed");

    (StatusCode::OK, Json(response)).into_response()
}

/// Liveness check endpoint.
///
/// Returns a simple response indicating the service process is alive.
#[instrument(name = "liveness_check", skip(app_state))]
pub async fn liveness_check(State(app_state): State<AppState>) -> Response {
    debug!("Performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": app_state.clock.now(),
        "service": "bayhook"
    });

    (StatusCode::OK, Json(response)).into_response()
}
