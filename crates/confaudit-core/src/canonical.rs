// SPDX-License-Identifier: Apache-2.0
//! Key-order independent JSON text and digests. Composite snapshot values
//! are compared through this text, and reports carry a digest of the
//! expected config they were built from.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| (key.clone(), sorted_keys(child)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        scalar => scalar.clone(),
    }
}

/// Compact JSON with object keys sorted at every level; array order is kept.
#[must_use]
pub fn stable_json_string(value: &Value) -> String {
    sorted_keys(value).to_string()
}

/// Lower-case SHA-256 hex of [`stable_json_string`].
pub fn stable_json_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let text = stable_json_string(&serde_json::to_value(value)?);
    Ok(format!("{:x}", Sha256::digest(text.as_bytes())))
}
