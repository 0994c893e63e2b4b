//! Warehouse client for single-row inserts.
//!
//! The ingest path hands one `OutputRow` per request to a `Warehouse`.
//! The production implementation is `BigQueryClient`, which calls the
//! BigQuery `tabledata.insertAll` API with an OAuth access token obtained
//! from a `TokenSource`.
//!
//! Inserts are a single synchronous attempt. Per-row rejections reported by
//! the warehouse come back as `InsertOutcome::Rejected`; anything that
//! prevented the call from completing is a `WarehouseError`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bayhook_core::OutputRow;
//! use bayhook_warehouse::{
//!     BigQueryClient, BigQueryConfig, InsertOutcome, StaticToken, TableRef, Warehouse,
//! };
//!
//! # async fn example() -> bayhook_warehouse::Result<()> {
//! let config = BigQueryConfig {
//!     table: TableRef::new("my-project", "parking", "bay_events"),
//!     ..Default::default()
//! };
//! let client = BigQueryClient::new(config, Arc::new(StaticToken::new("ya29.token")))?;
//!
//! match client.insert_row(&OutputRow::new()).await? {
//!     InsertOutcome::Inserted { rows } => println!("inserted {rows} row(s)"),
//!     InsertOutcome::Rejected { errors } => println!("rejected: {errors:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod outcome;
pub mod token;

use async_trait::async_trait;
use bayhook_core::OutputRow;

pub use client::{BigQueryClient, BigQueryConfig, TableRef};
pub use error::{Result, WarehouseError};
pub use outcome::{InsertOutcome, RowError};
pub use token::{MetadataServerToken, StaticToken, TokenSource};

/// Default BigQuery REST API base URL.
pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Default timeout for warehouse requests in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Destination that accepts single-row inserts.
#[async_trait]
pub trait Warehouse: Send + Sync + std::fmt::Debug {
    /// Inserts `row` into the destination table.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError` when the request could not be completed.
    /// Rows the warehouse received but refused are reported as
    /// `InsertOutcome::Rejected`, not as an error.
    async fn insert_row(&self, row: &OutputRow) -> Result<InsertOutcome>;

    /// Human-readable name of the destination, for logs.
    fn destination(&self) -> String;
}
