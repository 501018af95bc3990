//! Best-effort, never-failing conversion of [`Dynamic`] trees into JSON.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    Dynamic, ACCESS_DENIED_SENTINEL, BINARY_SENTINEL, CIRCULAR_SENTINEL, MAX_DEPTH_SENTINEL,
    NON_FINITE_SENTINEL, SKIPPED_KEYS, TRUNCATION_MARKER,
};

/// Bounds applied during sanitization.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SanitizeConfig {
    /// Containers nested deeper than this collapse to a sentinel.
    pub max_depth: usize,
    /// Character budget for text values; the remainder is discarded.
    pub max_text: usize,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_text: 1000,
        }
    }
}

/// Convert a runtime value into a JSON-safe tree.
///
/// Lossy by design: cycles, restricted reads, callables, binary payloads,
/// non-finite numbers and over-deep nesting all become fixed sentinel strings
/// instead of errors. This function does not fail and does not recurse beyond
/// `config.max_depth`.
pub fn sanitize(value: &Dynamic, config: &SanitizeConfig) -> Value {
    let mut visited = HashSet::new();
    sanitize_at(value, 0, config, &mut visited)
}

fn sanitize_at(
    value: &Dynamic,
    depth: usize,
    config: &SanitizeConfig,
    visited: &mut HashSet<usize>,
) -> Value {
    if depth > config.max_depth {
        return Value::String(MAX_DEPTH_SENTINEL.to_string());
    }

    match value {
        Dynamic::Null => Value::Null,
        Dynamic::Bool(b) => Value::Bool(*b),
        Dynamic::Int(i) => Value::Number(Number::from(*i)),
        Dynamic::Float(f) => match Number::from_f64(*f) {
            Some(n) => Value::Number(n),
            None => Value::String(NON_FINITE_SENTINEL.to_string()),
        },
        Dynamic::Text(s) => truncate_text(s, config.max_text),
        Dynamic::Binary(_) => Value::String(BINARY_SENTINEL.to_string()),
        Dynamic::Callable(name) => Value::String(format!("[Function: {name}]")),
        Dynamic::Restricted => Value::String(ACCESS_DENIED_SENTINEL.to_string()),
        Dynamic::List(cell) => {
            if !mark_visited(value, visited) {
                return Value::String(CIRCULAR_SENTINEL.to_string());
            }
            match cell.read() {
                Ok(items) => {
                    // A restricted slot in sequence position means iteration
                    // itself failed, which collapses the whole sequence.
                    if items.iter().any(|item| matches!(item, Dynamic::Restricted)) {
                        return Value::String(ACCESS_DENIED_SENTINEL.to_string());
                    }
                    Value::Array(
                        items
                            .iter()
                            .map(|item| sanitize_at(item, depth + 1, config, visited))
                            .collect(),
                    )
                }
                Err(_) => Value::String(ACCESS_DENIED_SENTINEL.to_string()),
            }
        }
        Dynamic::Object(cell) => {
            if !mark_visited(value, visited) {
                return Value::String(CIRCULAR_SENTINEL.to_string());
            }
            match cell.read() {
                Ok(entries) => {
                    let mut map = Map::new();
                    for (key, entry) in entries.iter() {
                        if SKIPPED_KEYS.contains(&key.as_str()) {
                            continue;
                        }
                        let rendered = match entry {
                            Dynamic::Restricted => {
                                Value::String(ACCESS_DENIED_SENTINEL.to_string())
                            }
                            other => sanitize_at(other, depth + 1, config, visited),
                        };
                        map.insert(key.clone(), rendered);
                    }
                    Value::Object(map)
                }
                Err(_) => Value::String(ACCESS_DENIED_SENTINEL.to_string()),
            }
        }
    }
}

/// Truncate text to the character budget, appending a marker when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> Value {
    Value::String(preview(text, max_chars))
}

/// String form of [`truncate_text`], for callers building previews directly.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}{TRUNCATION_MARKER}")
}

fn mark_visited(value: &Dynamic, visited: &mut HashSet<usize>) -> bool {
    match value.cell_addr() {
        Some(addr) => visited.insert(addr),
        None => true,
    }
}
