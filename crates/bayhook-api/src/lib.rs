//! bayhook HTTP API.
//!
//! Receives parking-bay webhooks, authenticates the caller by IP or token,
//! and writes one row per delivery to the configured warehouse table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

use std::{sync::Arc, time::Duration};

use bayhook_core::Clock;
use bayhook_warehouse::Warehouse;

pub use auth::{AuthError, AuthStrategy, Authenticator, Authorized};
pub use config::Config;
pub use error::IngestError;
pub use server::{create_router, start_server};

/// State shared by every request. Immutable after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Caller check for webhook routes
    pub authenticator: Arc<Authenticator>,
    /// Destination for ingested rows
    pub warehouse: Arc<dyn Warehouse>,
    /// Source of `receivedDate` and health timestamps
    pub clock: Arc<dyn Clock>,
    /// Deadline for the warehouse insert of one webhook
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates state from its parts.
    pub fn new(
        authenticator: Authenticator,
        warehouse: Arc<dyn Warehouse>,
        clock: Arc<dyn Clock>,
        request_timeout: Duration,
    ) -> Self {
        Self { authenticator: Arc::new(authenticator), warehouse, clock, request_timeout }
    }
}
