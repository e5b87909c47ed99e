//! Failure taxonomy for a `create` run

use std::path::PathBuf;
use thiserror::Error;

use crate::install::PackageManagerKind;
use crate::tree::TreeError;

/// Every way a scaffolding run can end in the `Failed` state
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Invalid project name: \"{name}\"\n{}", .reasons.join("\n"))]
    InvalidProjectName { name: String, reasons: Vec<String> },

    #[error("Invalid preset ({origin}): {reason}")]
    InvalidPreset { origin: String, reason: String },

    #[error("Preset \"{name}\" not found")]
    PresetNotFound { name: String },

    #[error("Failed to install plugins with {package_manager}")]
    InstallFailure {
        package_manager: PackageManagerKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Generator of plugin \"{plugin}\" failed")]
    GeneratorFailure {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cancelled: not writing into {}", .target.display())]
    ConflictAborted { target: PathBuf },

    #[error("Prompt failed")]
    Prompt(#[source] anyhow::Error),

    #[error("Filesystem error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CreateError {
    pub fn invalid_preset(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPreset {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn generator(plugin: impl Into<String>, source: anyhow::Error) -> Self {
        Self::GeneratorFailure {
            plugin: plugin.into(),
            source,
        }
    }

    /// Name of the plugin a failure is attributed to, if any
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::GeneratorFailure { plugin, .. } => Some(plugin),
            _ => None,
        }
    }
}

impl From<TreeError> for CreateError {
    /// Tree failures surface while resolving generator output, so they are
    /// attributed to the plugin that wrote the offending content
    fn from(e: TreeError) -> Self {
        let plugin = e.plugin().unwrap_or("unknown").to_string();
        Self::GeneratorFailure {
            plugin,
            source: e.into(),
        }
    }
}

pub type Result<T, E = CreateError> = std::result::Result<T, E>;
