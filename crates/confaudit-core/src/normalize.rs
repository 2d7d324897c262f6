// SPDX-License-Identifier: Apache-2.0
//! Lossy projections used for equality and substring tests, never for display.

use serde_json::Value;

use crate::canonical::stable_json_string;

/// Keeps ASCII letters and digits, lower-cased. Everything else is dropped.
#[must_use]
pub fn normalize_key(input: impl AsRef<str>) -> String {
    input
        .as_ref()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Scalars are stringified then normalized; lists and mappings go through
/// canonical JSON first so equal composites normalize identically.
#[must_use]
pub fn normalize_value_for_match(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => normalize_key(b.to_string()),
        Value::Number(n) => normalize_key(n.to_string()),
        Value::String(s) => normalize_key(s),
        Value::Array(_) | Value::Object(_) => normalize_key(stable_json_string(value)),
    }
}
