//! Destination row schema and row construction.
//!
//! The column set is fixed at deploy time. Each column is filled by
//! resolving a constant `FieldPath` against the inbound payload, then the
//! receipt timestamp is appended.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    payload::{resolve, FieldPath},
    time::Clock,
};

/// Column receiving the server-generated receipt timestamp.
pub const RECEIVED_DATE_COLUMN: &str = "receivedDate";

/// Timestamp layout for `receivedDate`, compatible with BigQuery `DATETIME`.
pub const RECEIVED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Payload-derived columns and the path each one is read from.
pub const ROW_SCHEMA: &[(&str, FieldPath<'static>)] = &[
    ("ssid", FieldPath::Key("ssid")),
    ("oxLocationId", FieldPath::Key("oxLocationId")),
    ("date", FieldPath::Key("date")),
    ("licensePlate", FieldPath::Key("licensePlate")),
    ("bay", FieldPath::Key("bay")),
    ("eventType", FieldPath::Key("eventType")),
];

/// A single flat row bound for the warehouse.
///
/// Serializes as a JSON object with columns in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRow(Map<String, Value>);

impl OutputRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Sets `column` to `value`, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Returns the value of `column`, if the row has that column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Returns the column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the row as a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Builds the destination row for `payload`.
///
/// Every column in `ROW_SCHEMA` is present, `null` when the payload does
/// not supply it, followed by `receivedDate` taken from `clock`.
pub fn build_row(payload: &Value, clock: &dyn Clock) -> OutputRow {
    let mut row = OutputRow::new();

    for (column, path) in ROW_SCHEMA {
        row.insert(*column, resolve(payload, path).clone());
    }

    row.insert(
        RECEIVED_DATE_COLUMN,
        Value::String(clock.now().format(RECEIVED_DATE_FORMAT).to_string()),
    );

    row
}
