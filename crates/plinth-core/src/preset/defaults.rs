//! Built-in presets

use super::model::{PluginEntry, Preset};
use crate::plugins::BABEL;
use std::collections::BTreeMap;

/// Name under which the built-in default preset is stored
pub const DEFAULT_PRESET_NAME: &str = "default";

/// The preset used by `--default` and by unattended runs
pub fn default_preset() -> Preset {
    let mut preset = Preset::default();
    preset.plugins.push(PluginEntry::new(BABEL));
    preset
}

pub fn builtin_presets() -> BTreeMap<String, Preset> {
    let mut presets = BTreeMap::new();
    presets.insert(DEFAULT_PRESET_NAME.to_string(), default_preset());
    presets
}
