//! HTTP request handlers for the bayhook API.
//!
//! Handlers are grouped by functionality:
//! - `ingest` - Webhook ingestion
//! - `health` - Health and liveness checks
//!
//! Authentication happens in middleware before `ingest` runs, so handlers
//! only see authorized requests.

pub mod health;
pub mod ingest;

pub use health::{health_check, liveness_check};
pub use ingest::ingest_webhook;
