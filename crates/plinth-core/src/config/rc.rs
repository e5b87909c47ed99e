//! User-level rc file (`~/.plinthrc`)
//!
//! Holds saved presets and the preferred package manager. Unknown keys are
//! preserved so newer versions of the tool can share the file.

use crate::install::PackageManagerKind;
use crate::preset::Preset;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the rc file location
pub const RC_PATH_ENV: &str = "PLINTH_RC_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RcFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManagerKind>,

    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RcFile {
    /// Resolve the rc file path: `PLINTH_RC_PATH`, else `<home>/<file_name>`
    pub fn default_path(file_name: &str) -> PathBuf {
        if let Ok(path) = std::env::var(RC_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(file_name)
    }

    /// Load the rc file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let mut content = serde_json::to_string_pretty(self).context("Failed to serialize rc file")?;
        content.push('\n');
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
