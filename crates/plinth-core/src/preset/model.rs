//! Preset and plugin entry types

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Supported CSS pre-processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CssPreprocessor {
    Sass,
    DartSass,
    Less,
    Stylus,
}

impl CssPreprocessor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CssPreprocessor::Sass => "sass",
            CssPreprocessor::DartSass => "dart-sass",
            CssPreprocessor::Less => "less",
            CssPreprocessor::Stylus => "stylus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sass" | "node-sass" => Some(Self::Sass),
            "dart-sass" => Some(Self::DartSass),
            "less" => Some(Self::Less),
            "stylus" => Some(Self::Stylus),
            _ => None,
        }
    }
}

/// One plugin selected by a preset
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    /// Package name, unique within a preset
    pub name: String,
    /// Semver range or dist-tag; `None` lets the installer choose
    pub version: Option<String>,
    /// Options handed to the plugin's generator
    pub options: Map<String, Value>,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    fn from_options(name: String, value: Value) -> Result<Self, String> {
        let mut options = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(format!(
                    "options of plugin \"{}\" must be an object, got {}",
                    name, other
                ))
            }
        };
        let version = match options.remove("version") {
            Some(Value::String(v)) => Some(v),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(format!(
                    "version of plugin \"{}\" must be a string, got {}",
                    name, other
                ))
            }
        };
        Ok(Self {
            name,
            version,
            options,
        })
    }
}

/// Ordered plugin list of a preset
///
/// Serialized as a JSON object keyed by plugin name (key order is preset
/// order). An array of `{ name, version?, options? }` is accepted on input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginList(Vec<PluginEntry>);

impl PluginList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PluginEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.0.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginEntry> {
        self.0.iter_mut().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    /// Append a plugin. Returns false (and leaves the list alone) when the name is taken.
    pub fn push(&mut self, entry: PluginEntry) -> bool {
        if self.contains(&entry.name) {
            return false;
        }
        self.0.push(entry);
        true
    }

    /// Insert a plugin at `index`. Returns false when the name is taken.
    pub fn insert(&mut self, index: usize, entry: PluginEntry) -> bool {
        if self.contains(&entry.name) {
            return false;
        }
        let index = index.min(self.0.len());
        self.0.insert(index, entry);
        true
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|p| p.name == name)
    }
}

impl<'a> IntoIterator for &'a PluginList {
    type Item = &'a PluginEntry;
    type IntoIter = std::slice::Iter<'a, PluginEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for PluginList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            let mut options = entry.options.clone();
            if let Some(version) = &entry.version {
                options.insert("version".to_string(), Value::String(version.clone()));
            }
            map.serialize_entry(&entry.name, &options)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PluginList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PluginListVisitor)
    }
}

struct PluginListVisitor;

impl PluginListVisitor {
    fn push<E: de::Error>(list: &mut PluginList, entry: PluginEntry) -> Result<(), E> {
        let name = entry.name.clone();
        if !list.push(entry) {
            return Err(E::custom(format!("duplicate plugin \"{}\"", name)));
        }
        Ok(())
    }
}

impl<'de> Visitor<'de> for PluginListVisitor {
    type Value = PluginList;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping plugin names to options, or a list of plugins")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PluginList, A::Error> {
        let mut list = PluginList::new();
        while let Some((name, options)) = access.next_entry::<String, Value>()? {
            let entry = PluginEntry::from_options(name, options).map_err(de::Error::custom)?;
            Self::push(&mut list, entry)?;
        }
        Ok(list)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<PluginList, A::Error> {
        #[derive(Deserialize)]
        struct Listed {
            name: String,
            #[serde(default)]
            version: Option<String>,
            #[serde(default)]
            options: Map<String, Value>,
        }

        let mut list = PluginList::new();
        while let Some(listed) = access.next_element::<Listed>()? {
            let entry = PluginEntry {
                name: listed.name,
                version: listed.version,
                options: listed.options,
            };
            Self::push(&mut list, entry)?;
        }
        Ok(list)
    }
}

/// A reusable scaffolding configuration: plugins plus shared options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub plugins: PluginList,

    /// Place tool configuration in dedicated files instead of the manifest
    #[serde(default)]
    pub use_config_files: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_history_mode: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vuex: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_preprocessor: Option<CssPreprocessor>,

    /// Fields this crate does not interpret, kept for round-tripping saved presets
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preset {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_form_keeps_order() {
        let preset = Preset::from_json(
            r#"{"plugins":{"@core/cli-plugin-vuex":{},"@core/cli-plugin-babel":{"version":"^4.0.0","loose":true},"@core/cli-plugin-router":{}}}"#,
        )
        .unwrap();

        assert_eq!(
            preset.plugins.names(),
            vec![
                "@core/cli-plugin-vuex",
                "@core/cli-plugin-babel",
                "@core/cli-plugin-router"
            ]
        );
        let babel = preset.plugins.get("@core/cli-plugin-babel").unwrap();
        assert_eq!(babel.version.as_deref(), Some("^4.0.0"));
        assert_eq!(babel.options.get("loose"), Some(&Value::Bool(true)));
        assert!(!babel.options.contains_key("version"));
    }

    #[test]
    fn test_parse_list_form() {
        let preset = Preset::from_json(
            r#"{"plugins":[{"name":"a"},{"name":"b","version":"~1.2.0","options":{"x":1}}]}"#,
        )
        .unwrap();
        assert_eq!(preset.plugins.names(), vec!["a", "b"]);
        assert_eq!(
            preset.plugins.get("b").unwrap().version.as_deref(),
            Some("~1.2.0")
        );
    }

    #[test]
    fn test_duplicate_plugins_rejected() {
        let err = Preset::from_json(r#"{"plugins":{"a":{},"a":{}}}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin \"a\""));

        let err = Preset::from_json(r#"{"plugins":[{"name":"a"},{"name":"a"}]}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin"));
    }

    #[test]
    fn test_missing_plugins_rejected() {
        let err = Preset::from_json(r#"{"useConfigFiles":true}"#).unwrap_err();
        assert!(err.to_string().contains("plugins"));
    }

    #[test]
    fn test_flags_and_extra_fields() {
        let preset = Preset::from_json(
            r#"{"plugins":{},"useConfigFiles":true,"router":true,"cssPreprocessor":"dart-sass","lintOn":["save"]}"#,
        )
        .unwrap();
        assert!(preset.use_config_files);
        assert_eq!(preset.router, Some(true));
        assert_eq!(preset.css_preprocessor, Some(CssPreprocessor::DartSass));
        assert_eq!(preset.extra.get("lintOn"), Some(&serde_json::json!(["save"])));
    }

    #[test]
    fn test_serialize_lifts_version_back_into_options() {
        let mut preset = Preset::default();
        let mut entry = PluginEntry::new("a").with_option("mode", "hash");
        entry.version = Some("^1.0.0".to_string());
        preset.plugins.push(entry);

        let json = serde_json::to_value(&preset).unwrap();
        assert_eq!(json["plugins"]["a"]["version"], "^1.0.0");
        assert_eq!(json["plugins"]["a"]["mode"], "hash");
        assert!(json.get("router").is_none());
    }

    #[test]
    fn test_plugin_list_refuses_duplicates() {
        let mut list = PluginList::new();
        assert!(list.push(PluginEntry::new("a")));
        assert!(!list.push(PluginEntry::new("a")));
        assert!(list.insert(0, PluginEntry::new("b")));
        assert_eq!(list.names(), vec!["b", "a"]);
    }
}
