use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

use crate::domain::model::Priority;

/// Hex-encoded SHA-256 fingerprint of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Fingerprint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Recursively rebuild a value with object keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialize with sorted object keys regardless of how the map is ordered.
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_stable(value, &mut out);
    out
}

fn write_stable(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_stable(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_stable(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

pub fn compute_fingerprint(sequence_id: &str, payload: &Value, priority: Priority) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(sequence_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(stable_stringify(payload).as_bytes());
    hasher.update([0x1f]);
    hasher.update(priority.as_str().as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Copy of `value` with every `keys` entry removed at any depth.
pub(crate) fn strip_keys(value: &Value, keys: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !keys.iter().any(|key| key == *k))
                .map(|(k, v)| (k.clone(), strip_keys(v, keys)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| strip_keys(v, keys)).collect()),
        other => other.clone(),
    }
}

/// Whether any of `keys` appears at any depth.
pub(crate) fn contains_key(value: &Value, keys: &[String]) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(k, v)| keys.iter().any(|key| key == k) || contains_key(v, keys)),
        Value::Array(items) => items.iter().any(|v| contains_key(v, keys)),
        _ => false,
    }
}

/// First re-entrancy marker found: one of `keys` holding a positive number
/// or `true`.
pub(crate) fn find_reentrancy_marker(value: &Value, keys: &[String]) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if keys.iter().any(|key| key == k) {
                    let marked = match v {
                        Value::Bool(b) => *b,
                        Value::Number(n) => n.as_f64().map(|f| f > 0.0).unwrap_or(false),
                        _ => false,
                    };
                    if marked {
                        return Some(k.clone());
                    }
                }
                if let Some(found) = find_reentrancy_marker(v, keys) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|v| find_reentrancy_marker(v, keys)),
        _ => None,
    }
}
