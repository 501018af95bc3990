//! Safe conversion of arbitrary runtime values into JSON.
//!
//! Payloads observed by the capture tap come from an application the observer
//! does not control: object graphs may contain cycles, reads may fail at a
//! cross-origin style boundary, and values may not be representable at all.
//! [`Dynamic`] models such values; [`sanitize`] turns them into a
//! `serde_json::Value` without ever failing, trading completeness for
//! boundedness; [`faithful_json`] is the strict counterpart that refuses
//! instead of substituting sentinels.

pub mod faithful;
pub mod sanitize;

pub use faithful::{faithful_json, FaithfulError};
pub use sanitize::{preview, sanitize, SanitizeConfig};

use std::sync::{Arc, RwLock};

/// Placeholder substituted when recursion reaches the configured bound.
pub const MAX_DEPTH_SENTINEL: &str = "[Max Depth Reached]";
/// Placeholder substituted for a value already visited in the current pass.
pub const CIRCULAR_SENTINEL: &str = "[Circular Reference]";
/// Placeholder substituted when reading a value fails.
pub const ACCESS_DENIED_SENTINEL: &str = "[Access Denied]";
/// Placeholder substituted for byte payloads with no textual form.
pub const BINARY_SENTINEL: &str = "[Binary Data]";
/// Placeholder substituted for numbers JSON cannot carry.
pub const NON_FINITE_SENTINEL: &str = "[Non-finite Number]";
/// Marker appended to text cut at the character budget.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Keys skipped up front during object traversal. `toJSON` is commonly
/// self-referential, the rest are cross-frame handles whose reads fail.
pub const SKIPPED_KEYS: &[&str] = &["toJSON", "contentWindow", "parent", "top"];

type Shared<T> = Arc<RwLock<T>>;

/// A runtime value as handed over by the observed host environment.
///
/// Lists and objects are shared cells so captured graphs can alias and form
/// cycles, exactly like the payloads they stand in for. [`Dynamic::Restricted`]
/// marks a slot whose read fails; where a sequence position holds it, iteration
/// of the sequence is considered failed as a whole.
#[derive(Clone, Debug)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Binary(Arc<Vec<u8>>),
    List(Shared<Vec<Dynamic>>),
    Object(Shared<Vec<(String, Dynamic)>>),
    Callable(String),
    Restricted,
}

impl Dynamic {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn binary(bytes: Vec<u8>) -> Self {
        Self::Binary(Arc::new(bytes))
    }

    pub fn list(items: Vec<Dynamic>) -> Self {
        Self::List(Arc::new(RwLock::new(items)))
    }

    pub fn object(entries: Vec<(String, Dynamic)>) -> Self {
        Self::Object(Arc::new(RwLock::new(entries)))
    }

    pub fn callable(name: impl Into<String>) -> Self {
        Self::Callable(name.into())
    }

    /// Append an entry to an object cell. No-op on any other variant.
    pub fn insert(&self, key: impl Into<String>, value: Dynamic) {
        if let Self::Object(cell) = self {
            if let Ok(mut entries) = cell.write() {
                entries.push((key.into(), value));
            }
        }
    }

    /// Append an element to a list cell. No-op on any other variant.
    pub fn push(&self, value: Dynamic) {
        if let Self::List(cell) = self {
            if let Ok(mut items) = cell.write() {
                items.push(value);
            }
        }
    }

    /// Lift an already JSON-safe tree into the runtime-value model.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Self::list(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Stable address of the backing cell, used for cycle detection.
    pub(crate) fn cell_addr(&self) -> Option<usize> {
        match self {
            Self::List(cell) => Some(Arc::as_ptr(cell) as *const () as usize),
            Self::Object(cell) => Some(Arc::as_ptr(cell) as *const () as usize),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_round_trips_scalars() {
        let value = serde_json::json!({"id": 1, "name": "kante", "active": true});
        let dynamic = Dynamic::from_json(&value);
        assert_eq!(sanitize(&dynamic, &SanitizeConfig::default()), value);
    }

    #[test]
    fn insert_and_push_only_touch_container_variants() {
        let obj = Dynamic::object(vec![]);
        obj.insert("a", Dynamic::Int(1));
        let text = Dynamic::text("x");
        text.insert("a", Dynamic::Int(1));
        assert_eq!(
            sanitize(&obj, &SanitizeConfig::default()),
            serde_json::json!({"a": 1})
        );
    }
}
