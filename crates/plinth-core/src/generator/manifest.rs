//! The shared project manifest (`package.json`)

use crate::tree::deep_merge;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const MANIFEST_FILE: &str = "package.json";

/// Top-level keys written first, in this order
const KEY_ORDER: &[&str] = &[
    "name",
    "version",
    "private",
    "description",
    "author",
    "scripts",
    "main",
    "module",
    "browser",
    "files",
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "babel",
    "eslintConfig",
    "prettier",
    "postcss",
    "browserslist",
    "jest",
];

const DEPENDENCY_KEYS: &[&str] = &["dependencies", "devDependencies", "peerDependencies"];

/// Project manifest shared by every generator of a run
///
/// Generators only merge into it; the object itself is never replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Fresh manifest for a new project
    pub fn new(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("version".to_string(), Value::from("0.1.0"));
        fields.insert("private".to_string(), Value::Bool(true));
        Self { fields }
    }

    /// Manifest of an existing project
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str(content).context("Failed to parse package.json")? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => anyhow::bail!("package.json must contain a JSON object"),
        }
    }

    /// Deep merge `fields` into the manifest
    ///
    /// Objects merge key-wise, arrays are concatenated and de-duplicated,
    /// scalars are replaced (last writer wins).
    pub fn extend(&mut self, fields: Value) -> Result<()> {
        let fields = match fields {
            Value::Object(fields) => fields,
            other => anyhow::bail!("extend_package expects a JSON object, got {}", other),
        };
        let mut current = Value::Object(std::mem::take(&mut self.fields));
        deep_merge(&mut current, Value::Object(fields));
        if let Value::Object(merged) = current {
            self.fields = merged;
        }
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn dependencies(&self) -> BTreeMap<String, String> {
        self.string_map("dependencies")
    }

    pub fn dev_dependencies(&self) -> BTreeMap<String, String> {
        self.string_map("devDependencies")
    }

    pub fn scripts(&self) -> BTreeMap<String, String> {
        self.string_map("scripts")
    }

    /// Union of dependencies and devDependencies; runtime ranges win on overlap
    pub fn all_dependencies(&self) -> BTreeMap<String, String> {
        let mut all = self.dev_dependencies();
        all.extend(self.dependencies());
        all
    }

    fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.fields
            .get(key)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Canonical JSON value: known keys first, dependency maps sorted
    pub fn to_value(&self) -> Value {
        let mut ordered = Map::new();
        for key in KEY_ORDER {
            if let Some(value) = self.fields.get(*key) {
                ordered.insert(key.to_string(), canonical_field(key, value));
            }
        }
        for (key, value) in &self.fields {
            if !ordered.contains_key(key) {
                ordered.insert(key.clone(), value.clone());
            }
        }
        Value::Object(ordered)
    }

    /// Pretty JSON with two-space indent and a trailing newline
    pub fn to_json(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.to_value())
            .unwrap_or_else(|_| "{}".to_string());
        out.push('\n');
        out
    }
}

fn canonical_field(key: &str, value: &Value) -> Value {
    match value {
        Value::Object(map) if DEPENDENCY_KEYS.contains(&key) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}
