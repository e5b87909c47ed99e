//! Saved preset storage

use super::defaults::builtin_presets;
use super::model::Preset;
use crate::config::RcFile;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// User-scoped store mapping preset name to preset
///
/// Read during resolution; written only when the user saves a preset.
pub trait PresetStore: Send + Sync {
    /// Every saved preset plus the built-in ones (saved presets shadow built-ins)
    fn load(&self) -> Result<BTreeMap<String, Preset>>;

    fn save(&self, name: &str, preset: &Preset) -> Result<()>;
}

/// Presets persisted in the rc file
#[derive(Debug, Clone)]
pub struct RcPresetStore {
    path: PathBuf,
}

impl RcPresetStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PresetStore for RcPresetStore {
    fn load(&self) -> Result<BTreeMap<String, Preset>> {
        let mut presets = builtin_presets();
        presets.extend(RcFile::load(&self.path)?.presets);
        Ok(presets)
    }

    fn save(&self, name: &str, preset: &Preset) -> Result<()> {
        let mut rc = RcFile::load(&self.path)?;
        rc.presets.insert(name.to_string(), preset.clone());
        rc.save(&self.path)?;
        tracing::info!(preset = name, path = %self.path.display(), "saved preset");
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: Mutex<BTreeMap<String, Preset>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(self, name: &str, preset: Preset) -> Self {
        if let Ok(mut presets) = self.presets.lock() {
            presets.insert(name.to_string(), preset);
        }
        self
    }

    /// Presets saved through this store (built-ins excluded)
    pub fn saved(&self) -> BTreeMap<String, Preset> {
        self.presets.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load(&self) -> Result<BTreeMap<String, Preset>> {
        let mut presets = builtin_presets();
        presets.extend(self.saved());
        Ok(presets)
    }

    fn save(&self, name: &str, preset: &Preset) -> Result<()> {
        self.presets
            .lock()
            .map_err(|_| anyhow::anyhow!("preset store lock poisoned"))?
            .insert(name.to_string(), preset.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::PluginEntry;

    #[test]
    fn test_builtin_default_always_present() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RcPresetStore::new(tmp.path().join(".plinthrc"));
        let presets = store.load().unwrap();
        assert!(presets.contains_key("default"));
    }

    #[test]
    fn test_rc_store_persists_saved_preset() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RcPresetStore::new(tmp.path().join(".plinthrc"));
        let mut preset = Preset::default();
        preset.plugins.push(PluginEntry::new("@core/cli-plugin-vuex"));

        store.save("state", &preset).unwrap();

        let again = RcPresetStore::new(tmp.path().join(".plinthrc"));
        assert_eq!(again.load().unwrap().get("state"), Some(&preset));
    }

    #[test]
    fn test_saved_preset_shadows_builtin() {
        let mut preset = Preset::default();
        preset.plugins.push(PluginEntry::new("custom"));
        let store = MemoryPresetStore::new().with_preset("default", preset.clone());
        assert_eq!(store.load().unwrap().get("default"), Some(&preset));
    }
}
