//! Strict conversion of [`Dynamic`] trees into JSON.
//!
//! The counterpart of [`crate::sanitize`]: instead of substituting sentinels
//! this refuses with an error on the first value JSON cannot carry. The
//! exporter uses it for the full-fidelity attempt and falls back to a
//! reduced schema when it fails.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::Dynamic;

#[derive(Clone, Debug, Error)]
pub enum FaithfulError {
    #[error("circular reference")]
    Circular,
    #[error("access restricted value")]
    Restricted,
    #[error("callable value: {0}")]
    Callable(String),
    #[error("binary payload")]
    Binary,
    #[error("non-finite number: {0}")]
    NonFinite(f64),
    #[error("poisoned value cell")]
    Poisoned,
}

/// Convert a runtime value into JSON exactly, erring on anything lossy.
pub fn faithful_json(value: &Dynamic) -> Result<Value, FaithfulError> {
    let mut path = HashSet::new();
    faithful_at(value, &mut path)
}

fn faithful_at(value: &Dynamic, path: &mut HashSet<usize>) -> Result<Value, FaithfulError> {
    match value {
        Dynamic::Null => Ok(Value::Null),
        Dynamic::Bool(b) => Ok(Value::Bool(*b)),
        Dynamic::Int(i) => Ok(Value::Number(Number::from(*i))),
        Dynamic::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or(FaithfulError::NonFinite(*f)),
        Dynamic::Text(s) => Ok(Value::String(s.clone())),
        Dynamic::Binary(_) => Err(FaithfulError::Binary),
        Dynamic::Callable(name) => Err(FaithfulError::Callable(name.clone())),
        Dynamic::Restricted => Err(FaithfulError::Restricted),
        Dynamic::List(cell) => {
            let addr = container_addr(value)?;
            if !path.insert(addr) {
                return Err(FaithfulError::Circular);
            }
            let items = cell.read().map_err(|_| FaithfulError::Poisoned)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(faithful_at(item, path)?);
            }
            path.remove(&addr);
            Ok(Value::Array(out))
        }
        Dynamic::Object(cell) => {
            let addr = container_addr(value)?;
            if !path.insert(addr) {
                return Err(FaithfulError::Circular);
            }
            let entries = cell.read().map_err(|_| FaithfulError::Poisoned)?;
            let mut map = Map::new();
            for (key, entry) in entries.iter() {
                map.insert(key.clone(), faithful_at(entry, path)?);
            }
            path.remove(&addr);
            Ok(Value::Object(map))
        }
    }
}

fn container_addr(value: &Dynamic) -> Result<usize, FaithfulError> {
    value.cell_addr().ok_or(FaithfulError::Poisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_trees_convert_exactly() {
        let value = Dynamic::object(vec![
            ("id".into(), Dynamic::Int(1)),
            (
                "tags".into(),
                Dynamic::list(vec![Dynamic::text("a"), Dynamic::text("b")]),
            ),
        ]);
        assert_eq!(
            faithful_json(&value).expect("clean tree"),
            json!({"id": 1, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn cycle_is_an_error_not_a_hang() {
        let node = Dynamic::object(vec![]);
        node.insert("me", node.clone());
        assert!(matches!(faithful_json(&node), Err(FaithfulError::Circular)));
    }

    #[test]
    fn shared_but_acyclic_nodes_are_allowed() {
        let shared = Dynamic::list(vec![Dynamic::Int(1)]);
        let value = Dynamic::object(vec![
            ("a".into(), shared.clone()),
            ("b".into(), shared),
        ]);
        assert!(faithful_json(&value).is_ok());
    }

    #[test]
    fn lossy_values_are_refused() {
        assert!(matches!(
            faithful_json(&Dynamic::Float(f64::INFINITY)),
            Err(FaithfulError::NonFinite(_))
        ));
        assert!(matches!(
            faithful_json(&Dynamic::Restricted),
            Err(FaithfulError::Restricted)
        ));
        assert!(matches!(
            faithful_json(&Dynamic::callable("fetch")),
            Err(FaithfulError::Callable(_))
        ));
        assert!(matches!(
            faithful_json(&Dynamic::binary(vec![1, 2])),
            Err(FaithfulError::Binary)
        ));
    }
}
