//! Merge middleware for paths several plugins write to

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

/// Combines the current content of a path with content written later
pub trait Merge: Send + Sync {
    fn merge(&self, current: &str, incoming: &str) -> Result<String>;
}

impl<F> Merge for F
where
    F: Fn(&str, &str) -> Result<String> + Send + Sync,
{
    fn merge(&self, current: &str, incoming: &str) -> Result<String> {
        self(current, incoming)
    }
}

/// Shared handle to a merge middleware
pub type Middleware = Arc<dyn Merge>;

/// Deep merge `source` into `target`
///
/// Objects merge key-wise, arrays are concatenated and de-duplicated, any
/// other combination is replaced by `source`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            let mut merged: Vec<Value> = Vec::with_capacity(target.len() + source.len());
            for value in target.drain(..).chain(source) {
                if !merged.contains(&value) {
                    merged.push(value);
                }
            }
            *target = merged;
        }
        (target, source) => *target = source,
    }
}

/// Deep-merges JSON documents; the incoming document wins on scalar conflicts
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMerge;

impl Merge for JsonMerge {
    fn merge(&self, current: &str, incoming: &str) -> Result<String> {
        let mut merged: Value =
            serde_json::from_str(current).context("Current content is not valid JSON")?;
        let incoming: Value =
            serde_json::from_str(incoming).context("Incoming content is not valid JSON")?;
        deep_merge(&mut merged, incoming);
        let mut out = serde_json::to_string_pretty(&merged)?;
        out.push('\n');
        Ok(out)
    }
}

/// Appends incoming lines that the current content does not already have
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendLines;

impl Merge for AppendLines {
    fn merge(&self, current: &str, incoming: &str) -> Result<String> {
        let mut out = current.to_string();
        for line in incoming.lines() {
            if line.trim().is_empty() || current.lines().any(|l| l == line) {
                continue;
            }
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_objects_and_scalars() {
        let mut target = json!({"a": {"x": 1, "y": 2}, "b": "old"});
        deep_merge(&mut target, json!({"a": {"y": 3, "z": 4}, "b": "new"}));
        assert_eq!(target, json!({"a": {"x": 1, "y": 3, "z": 4}, "b": "new"}));
    }

    #[test]
    fn test_deep_merge_arrays_dedup() {
        let mut target = json!({"list": ["a", "b", "a"]});
        deep_merge(&mut target, json!({"list": ["b", "c"]}));
        assert_eq!(target, json!({"list": ["a", "b", "c"]}));
    }

    #[test]
    fn test_deep_merge_type_change_replaces() {
        let mut target = json!({"k": [1, 2]});
        deep_merge(&mut target, json!({"k": {"now": "object"}}));
        assert_eq!(target, json!({"k": {"now": "object"}}));
    }

    #[test]
    fn test_json_merge_incoming_wins() {
        let merged = JsonMerge
            .merge(r#"{"name":"old","keep":true}"#, r#"{"name":"new"}"#)
            .unwrap();
        let value: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value, json!({"name": "new", "keep": true}));
        assert!(merged.ends_with('\n'));
    }

    #[test]
    fn test_json_merge_rejects_invalid_json() {
        assert!(JsonMerge.merge("not json", "{}").is_err());
    }

    #[test]
    fn test_append_lines_skips_existing() {
        let merged = AppendLines
            .merge("node_modules\n/dist", "/dist\n.env.local\n\n")
            .unwrap();
        assert_eq!(merged, "node_modules\n/dist\n.env.local\n");
    }

    #[test]
    fn test_closure_middleware() {
        let upper = |current: &str, incoming: &str| -> Result<String> {
            Ok(format!("{}{}", current, incoming.to_uppercase()))
        };
        assert_eq!(upper.merge("a", "b").unwrap(), "aB");
    }
}
