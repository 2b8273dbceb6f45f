//! Snapshot serialization
//!
//! Converts a live [`Value`] into a [`SerializedValue`]:
//!
//! - dates become ISO-8601 strings (`2024-01-02T03:04:05.678Z`)
//! - maps become string-keyed objects; non-string keys go through a stable
//!   JSON stringification
//! - sets become arrays in iteration order
//! - functions are kept as references
//!
//! A single identity set is threaded through the whole call. A container met
//! a second time anywhere in the same pass, whether through a true cycle or a
//! shared substructure, is replaced by [`CIRCULAR_MARKER`] and not descended.

use chrono::SecondsFormat;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::{Error, Result};
use crate::value::{number_to_json, SerializedValue, Value};

/// Replacement text for a container already visited in this pass.
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// Serialize `value` with a fresh identity set.
pub fn serialize(value: &Value) -> SerializedValue {
    SnapshotSerializer::default().serialize(value)
}

/// Serializer state for one top-level pass.
#[derive(Default)]
pub struct SnapshotSerializer {
    seen: FxHashSet<usize>,
}

impl SnapshotSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serialize(&mut self, value: &Value) -> SerializedValue {
        let id = match value {
            Value::Null => return SerializedValue::Null,
            Value::Function(func) => return SerializedValue::Function(func.clone()),
            Value::Bool(b) => return SerializedValue::Bool(*b),
            Value::Number(n) => return SerializedValue::Number(*n),
            Value::String(s) => return SerializedValue::String(s.clone()),
            _ => match value.identity() {
                Some(id) => id,
                None => return SerializedValue::Null,
            },
        };

        if !self.seen.insert(id) {
            return SerializedValue::String(CIRCULAR_MARKER.to_string());
        }

        match value {
            Value::Date(at) => {
                SerializedValue::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Map(entries) => {
                let mut out = IndexMap::new();
                for (key, val) in entries.borrow().iter() {
                    let key = match key {
                        Value::String(s) => s.clone(),
                        other => stringify_key(other),
                    };
                    let val = self.serialize(val);
                    out.insert(key, val);
                }
                SerializedValue::Object(out)
            }
            Value::Set(items) | Value::Array(items) => SerializedValue::Array(
                items.borrow().iter().map(|item| self.serialize(item)).collect(),
            ),
            Value::Object(entries) => {
                let mut out = IndexMap::with_capacity(entries.borrow().len());
                for (key, val) in entries.borrow().iter() {
                    let val = self.serialize(val);
                    out.insert(key.clone(), val);
                }
                SerializedValue::Object(out)
            }
            _ => SerializedValue::Null,
        }
    }
}

/// String form of a non-string map key.
///
/// Falls back to a placeholder when the key has no JSON form.
fn stringify_key(key: &Value) -> String {
    match json_stringify(key) {
        Ok(text) => text,
        Err(err) => {
            trace!(%err, kind = key.kind_name(), "map key fell back to display form");
            placeholder(key)
        }
    }
}

/// Stable compact JSON text for a live value.
///
/// Follows the usual JSON conventions for live state: dates print as ISO
/// strings, maps and sets have no enumerable members and print as `{}`,
/// functions print as `undefined` at the top level, are skipped in objects
/// and become `null` in arrays. A value that contains itself is an error.
pub fn json_stringify(value: &Value) -> Result<String> {
    if let Value::Function(_) = value {
        return Ok("undefined".to_string());
    }
    let mut ancestors = Vec::new();
    let json = to_json(value, &mut ancestors)?;
    Ok(serde_json::to_string(&json)?)
}

fn to_json(value: &Value, ancestors: &mut Vec<usize>) -> Result<serde_json::Value> {
    if let Some(id) = value.identity() {
        if ancestors.contains(&id) {
            return Err(Error::SerializationFailure(
                "converting circular structure to JSON".to_string(),
            ));
        }
    }

    let json = match value {
        Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(at) => {
            serde_json::Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::Map(_) | Value::Set(_) => serde_json::Value::Object(serde_json::Map::new()),
        Value::Array(items) => {
            ancestors.push(value.identity().unwrap_or_default());
            let out = items
                .borrow()
                .iter()
                .map(|item| to_json(item, ancestors))
                .collect::<Result<Vec<_>>>();
            ancestors.pop();
            serde_json::Value::Array(out?)
        }
        Value::Object(entries) => {
            ancestors.push(value.identity().unwrap_or_default());
            let mut out = serde_json::Map::new();
            let mut failure = None;
            for (key, val) in entries.borrow().iter() {
                if let Value::Function(_) = val {
                    continue;
                }
                match to_json(val, ancestors) {
                    Ok(json) => {
                        out.insert(key.clone(), json);
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            ancestors.pop();
            if let Some(err) = failure {
                return Err(err);
            }
            serde_json::Value::Object(out)
        }
    };
    Ok(json)
}

fn placeholder(value: &Value) -> String {
    match value {
        Value::Array(_) => "[object Array]".to_string(),
        Value::Map(_) => "[object Map]".to_string(),
        Value::Set(_) => "[object Set]".to_string(),
        _ => "[object Object]".to_string(),
    }
}
