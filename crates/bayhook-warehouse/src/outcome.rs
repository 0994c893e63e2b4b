//! Typed result of an insert the warehouse actually processed.

use std::fmt;

use serde::Serialize;

/// What the warehouse did with the submitted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// All rows were accepted.
    Inserted {
        /// Number of rows written
        rows: usize,
    },
    /// One or more rows were refused.
    Rejected {
        /// Per-row diagnostics, in the order the warehouse reported them
        errors: Vec<RowError>,
    },
}

impl InsertOutcome {
    /// Returns whether every row was accepted.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

/// Diagnostic for a single refused row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Zero-based index of the row in the request
    pub index: u64,
    /// Short machine-readable reason, e.g. `invalid`
    pub reason: String,
    /// Column or field the error refers to, if reported
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.index, self.reason)?;
        if !self.location.is_empty() {
            write!(f, " at {}", self.location)?;
        }
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}
