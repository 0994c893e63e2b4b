//! Core domain types for the bayhook webhook receiver.
//!
//! Holds everything that is pure in-memory computation: the tolerant
//! field resolver over inbound JSON, the fixed destination row schema,
//! and the clock used to stamp rows. Nothing in this crate performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod payload;
pub mod row;
pub mod time;

pub use error::{CoreError, Result};
pub use payload::{is_empty, parse_payload, resolve, FieldPath};
pub use row::{build_row, OutputRow, RECEIVED_DATE_COLUMN, ROW_SCHEMA};
pub use time::{Clock, FixedClock, RealClock};
