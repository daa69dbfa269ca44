//! Hashing - artifact digests and canonical context JSON
//!
//! Two passes over the same inputs must yield the same digest.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    to_string(&sort_value(serde_json::to_value(value)?))
}

// Rebuilt in key order so the result holds even with `preserve_order` enabled
fn sort_value(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_value(v))).collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_value).collect()),
        other => other,
    }
}

/// Digest of a resolved render context, independent of key order
pub fn context_digest<T: Serialize>(context: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(context)?.as_bytes()))
}
