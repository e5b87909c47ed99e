//! Plugin installation
//!
//! This module provides:
//! - Package manager selection (CLI flag, rc preference, detection)
//! - The package manager collaborator and its process-backed implementation
//! - The installer writing the initial manifest and rolling it back on failure

pub mod detect;
pub mod package_manager;

use crate::error::CreateError;
use crate::generator::{LoadedPlugin, Manifest, MANIFEST_FILE};
use crate::plugins::{PluginCatalog, FALLBACK_VERSION};
use crate::preset::Preset;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub use detect::{detect_package_manager, is_available, select_package_manager};
pub use package_manager::{CommandPackageManager, PackageManager, DEFAULT_INSTALL_TIMEOUT};

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManagerKind {
    /// Executable name
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Yarn => "yarn",
            PackageManagerKind::Pnpm => "pnpm",
        }
    }

    /// Arguments of the install invocation
    pub fn install_args(&self, registry: Option<&Url>) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        match self {
            PackageManagerKind::Npm => args.extend(["--loglevel".to_string(), "error".to_string()]),
            PackageManagerKind::Pnpm => {
                args.extend(["--reporter".to_string(), "silent".to_string()])
            }
            PackageManagerKind::Yarn => {}
        }
        if let Some(registry) = registry {
            args.push(format!("--registry={}", registry));
        }
        args
    }

    /// Command line shown to users for installing dependencies
    pub fn install_command(&self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm install",
            PackageManagerKind::Yarn => "yarn",
            PackageManagerKind::Pnpm => "pnpm install",
        }
    }

    /// Command line shown to users for running a manifest script
    pub fn run_command(&self, script: &str) -> String {
        match self {
            PackageManagerKind::Npm => format!("npm run {}", script),
            PackageManagerKind::Yarn => format!("yarn {}", script),
            PackageManagerKind::Pnpm => format!("pnpm run {}", script),
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

/// What one package-manager run has to install
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationPlan {
    /// dependencies ∪ devDependencies of the manifest
    pub project_deps: BTreeMap<String, String>,
    pub package_manager: PackageManagerKind,
    pub registry: Option<Url>,
}

impl InstallationPlan {
    pub fn from_manifest(
        manifest: &Manifest,
        package_manager: PackageManagerKind,
        registry: Option<Url>,
    ) -> Self {
        Self {
            project_deps: manifest.all_dependencies(),
            package_manager,
            registry,
        }
    }
}

/// Pre-pipeline content of files the pipeline writes before generation
///
/// `None` means the file did not exist.
pub type Baseline = BTreeMap<String, Option<Vec<u8>>>;

/// Result of a successful installation
pub struct Installed {
    pub plugins: Vec<LoadedPlugin>,
    pub manifest: Manifest,
    pub plan: InstallationPlan,
    pub baseline: Baseline,
}

/// Installs every plugin of a preset with one package-manager run
pub struct PluginInstaller<'a> {
    pub catalog: &'a PluginCatalog,
    pub package_manager: &'a dyn PackageManager,
}

impl PluginInstaller<'_> {
    /// Add the preset's installable plugins to `manifest` as devDependencies
    pub fn add_plugin_dependencies(&self, preset: &Preset, manifest: &mut Manifest) {
        let mut dev = Map::new();
        for entry in preset.plugins.iter() {
            if self.catalog.is_bundled(&entry.name) {
                continue;
            }
            let version = entry
                .version
                .as_deref()
                .or_else(|| self.catalog.default_version(&entry.name))
                .unwrap_or(FALLBACK_VERSION);
            dev.insert(entry.name.clone(), Value::from(version));
        }
        if dev.is_empty() {
            return;
        }
        let mut fields = Map::new();
        fields.insert("devDependencies".to_string(), Value::Object(dev));
        // always an object, so extend cannot fail
        if let Err(e) = manifest.extend(Value::Object(fields)) {
            tracing::warn!(error = %e, "failed to record plugin dependencies");
        }
    }

    /// Write the manifest into `dir`, run the package manager once and load generators
    ///
    /// On failure the manifest that was there before is restored (or the
    /// written one removed, together with `dir` if this call created it).
    pub async fn install(
        &self,
        preset: &Preset,
        dir: &Path,
        mut manifest: Manifest,
        package_manager: PackageManagerKind,
        registry: Option<Url>,
    ) -> Result<Installed, CreateError> {
        self.add_plugin_dependencies(preset, &mut manifest);
        let plan = InstallationPlan::from_manifest(&manifest, package_manager, registry);

        let manifest_path = dir.join(MANIFEST_FILE);
        let created_dir = !dir.exists();
        let previous = read_optional(&manifest_path).await?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CreateError::io(dir, e))?;
        tokio::fs::write(&manifest_path, manifest.to_json())
            .await
            .map_err(|e| CreateError::io(&manifest_path, e))?;

        tracing::info!(
            package_manager = %package_manager,
            dependencies = plan.project_deps.len(),
            "installing plugins"
        );
        if let Err(source) = self.package_manager.install(dir, &plan).await {
            tracing::warn!(error = %format!("{:#}", source), "installation failed; restoring manifest");
            restore(dir, &manifest_path, previous.as_deref(), created_dir).await;
            return Err(CreateError::InstallFailure {
                package_manager,
                source,
            });
        }

        let mut baseline = Baseline::new();
        baseline.insert(MANIFEST_FILE.to_string(), previous);

        Ok(Installed {
            plugins: self.catalog.load(preset),
            manifest,
            plan,
            baseline,
        })
    }
}

async fn read_optional(path: &PathBuf) -> Result<Option<Vec<u8>>, CreateError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CreateError::io(path, e)),
    }
}

async fn restore(dir: &Path, manifest_path: &Path, previous: Option<&[u8]>, created_dir: bool) {
    let result = match (previous, created_dir) {
        (_, true) => tokio::fs::remove_dir_all(dir).await,
        (Some(bytes), false) => tokio::fs::write(manifest_path, bytes).await,
        (None, false) => tokio::fs::remove_file(manifest_path).await,
    };
    if let Err(e) = result {
        tracing::warn!(path = %manifest_path.display(), error = %e, "failed to restore manifest");
    }
}


#[cfg(test)]
mod tests {
    use super::fake::RecordingPackageManager;
    use super::*;
    use crate::plugins::{BABEL, CORE_PLUGIN_VERSION, GITIGNORE, SERVICE};
    use crate::preset::{prepare_preset, PluginEntry};

    fn preset() -> Preset {
        let mut preset = Preset::default();
        preset.plugins.push(PluginEntry::new(BABEL));
        let mut pinned = PluginEntry::new("@acme/cli-plugin-extra");
        pinned.version = Some("^1.2.0".to_string());
        preset.plugins.push(pinned);
        prepare_preset(preset, "app", false).unwrap()
    }

    #[test]
    fn test_install_args() {
        assert_eq!(
            PackageManagerKind::Npm.install_args(None),
            vec!["install", "--loglevel", "error"]
        );
        let registry = Url::parse("https://registry.example.com/").unwrap();
        assert_eq!(
            PackageManagerKind::Yarn.install_args(Some(&registry)),
            vec!["install", "--registry=https://registry.example.com/"]
        );
        assert_eq!(PackageManagerKind::Pnpm.to_string(), "pnpm");
        assert_eq!(PackageManagerKind::Yarn.run_command("serve"), "yarn serve");
    }

    #[tokio::test]
    async fn test_install_runs_once_with_plugin_dev_dependencies() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("app");
        let catalog = PluginCatalog::builtin();
        let pm = RecordingPackageManager::default();
        let installer = PluginInstaller {
            catalog: &catalog,
            package_manager: &pm,
        };

        let installed = installer
            .install(&preset(), &dir, Manifest::new("app"), PackageManagerKind::Npm, None)
            .await
            .unwrap();

        assert_eq!(pm.calls(), 1);
        let deps = &installed.plan.project_deps;
        assert_eq!(deps.get(SERVICE).map(String::as_str), Some(CORE_PLUGIN_VERSION));
        assert_eq!(deps.get("@acme/cli-plugin-extra").map(String::as_str), Some("^1.2.0"));
        assert!(!deps.contains_key(GITIGNORE));

        let written = std::fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap();
        assert_eq!(Manifest::parse(&written).unwrap().name(), Some("app"));
        assert_eq!(installed.baseline.get(MANIFEST_FILE), Some(&None));
        assert_eq!(installed.plugins.len(), 4);
    }

    #[tokio::test]
    async fn test_failure_restores_previous_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let previous = "{\n  \"name\": \"old\"\n}\n";
        std::fs::write(tmp.path().join(MANIFEST_FILE), previous).unwrap();
        let catalog = PluginCatalog::builtin();
        let pm = RecordingPackageManager::failing();
        let installer = PluginInstaller {
            catalog: &catalog,
            package_manager: &pm,
        };

        let err = installer
            .install(&preset(), tmp.path(), Manifest::new("app"), PackageManagerKind::Yarn, None)
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            CreateError::InstallFailure {
                package_manager: PackageManagerKind::Yarn,
                ..
            }
        ));
        assert_eq!(pm.calls(), 1);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap(),
            previous
        );
    }

    #[tokio::test]
    async fn test_failure_removes_created_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fresh");
        let catalog = PluginCatalog::builtin();
        let pm = RecordingPackageManager::failing();
        let installer = PluginInstaller {
            catalog: &catalog,
            package_manager: &pm,
        };

        let result = installer
            .install(&preset(), &dir, Manifest::new("fresh"), PackageManagerKind::Npm, None)
            .await;
        assert!(result.is_err());
        assert!(!dir.exists());
    }
}
