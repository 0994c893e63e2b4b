//! Tolerant field resolution over inbound webhook payloads.
//!
//! Webhook senders are inconsistent about shape: the same field may arrive
//! as a scalar, as a one-element list, or not at all. Resolution walks a
//! fixed key path through the JSON tree, stepping into the first element
//! of any list it meets, and collapses every kind of absence to `null`.
//!
//! # Empty values
//!
//! A key whose value is *empty* is treated exactly as if it were missing.
//! Empty means: `null`, `false`, `0`, `0.0`, `""`, `"0"`, `[]` and `{}`.
//! This is intentionally over-tolerant: a literal `false` or `0` in the
//! payload becomes `null` in the row.

use std::fmt;

use serde_json::Value;

use crate::error::{CoreError, Result};

static NULL: Value = Value::Null;

/// A descent path through a payload.
///
/// Paths are constants of the destination schema, never built from request
/// data. A single key is equivalent to a one-element sequence.
///
/// # Example
///
/// ```
/// use bayhook_core::FieldPath;
///
/// let path = FieldPath::Keys(&["vehicle", "plate"]);
/// assert_eq!(path.to_string(), "vehicle.plate");
/// assert_eq!(FieldPath::Key("bay").keys(), &["bay"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath<'a> {
    /// A single top-level key.
    Key(&'a str),
    /// An ordered sequence of keys, outermost first.
    Keys(&'a [&'a str]),
}

impl<'a> FieldPath<'a> {
    /// Returns the keys of this path in descent order.
    pub fn keys(&self) -> &[&'a str] {
        match self {
            Self::Key(key) => std::slice::from_ref(key),
            Self::Keys(keys) => *keys,
        }
    }
}

impl fmt::Display for FieldPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys().join("."))
    }
}

/// Resolves `path` against `payload`.
///
/// Never fails. Returns `Value::Null` as soon as the walk meets a
/// non-object container, a missing key, or an empty value. When a traversed
/// value is a list, the walk continues from its first element. The final
/// value is returned as-is and may itself be an object or list.
///
/// # Example
///
/// ```
/// use bayhook_core::{resolve, FieldPath};
/// use serde_json::json;
///
/// let payload = json!({"ssid": ["A123"], "bay": "5"});
///
/// assert_eq!(resolve(&payload, &FieldPath::Key("ssid")), &json!("A123"));
/// assert_eq!(resolve(&payload, &FieldPath::Key("bay")), &json!("5"));
/// assert!(resolve(&payload, &FieldPath::Key("missing")).is_null());
/// ```
pub fn resolve<'v>(payload: &'v Value, path: &FieldPath<'_>) -> &'v Value {
    let mut current = payload;

    for key in path.keys() {
        let Some(value) = current.as_object().and_then(|map| map.get(*key)) else {
            return &NULL;
        };

        if is_empty(value) {
            return &NULL;
        }

        current = match value {
            // Non-empty, so the first element exists.
            Value::Array(items) => &items[0],
            other => other,
        };
    }

    current
}

/// Returns whether `value` counts as empty for resolution purposes.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Parses a raw request body into a payload.
///
/// # Errors
///
/// Returns `CoreError::InvalidJson` if the body is not valid JSON, and
/// `CoreError::EmptyPayload` if it decodes to an empty value.
pub fn parse_payload(body: &[u8]) -> Result<Value> {
    let payload: Value = serde_json::from_slice(body)?;

    if is_empty(&payload) {
        return Err(CoreError::EmptyPayload);
    }

    Ok(payload)
}
