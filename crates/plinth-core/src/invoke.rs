//! Adding or re-running a single plugin in an existing project
//!
//! `add` installs the plugin and then invokes it; `invoke` only runs the
//! generator of a plugin the project already depends on. Both go through the
//! same generation, conflict resolution and write steps as `create`, starting
//! from a tree seeded with the project's current files.

use crate::conflict::{write_plan, ConflictResolver, WritePlan};
use crate::error::CreateError;
use crate::generator::{run_generators_on, Manifest, MANIFEST_FILE};
use crate::install::{
    select_package_manager, Baseline, InstallationPlan, PackageManager, PackageManagerKind,
    PluginInstaller,
};
use crate::plugins::{PluginCatalog, SERVICE};
use crate::preset::{PluginEntry, Preset};
use crate::prompt::Prompter;
use crate::tree::VirtualTree;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

/// Official plugins that can be referred to by their short name
const CORE_SHORT_NAMES: &[&str] = &["babel", "router", "vuex"];

/// Directories never read into the tree
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Expand a short plugin name into its package name
///
/// `router` → `@core/cli-plugin-router`, `foo` → `cli-plugin-foo`,
/// `@acme/foo` → `@acme/cli-plugin-foo`. Full names pass through.
pub fn resolve_plugin_id(name: &str) -> String {
    if name == SERVICE || name.contains("cli-plugin-") {
        return name.to_string();
    }
    if CORE_SHORT_NAMES.contains(&name) {
        return format!("@core/cli-plugin-{}", name);
    }
    match name.strip_prefix('@').and_then(|n| n.split_once('/')) {
        Some((scope, short)) => format!("@{}/cli-plugin-{}", scope, short),
        None => format!("cli-plugin-{}", name),
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Generator options, as `--option key=value` pairs parsed by the caller
    pub options: Map<String, Value>,
    pub package_manager: Option<PackageManagerKind>,
    pub registry: Option<Url>,
    /// Version range for `add`
    pub version: Option<String>,
}

#[derive(Debug)]
pub struct Invoked {
    pub plugin: String,
    pub plan: WritePlan,
    pub written: Vec<String>,
}

/// Runs one plugin against an existing project directory
pub struct Invoker<'a> {
    pub dir: PathBuf,
    pub prompter: &'a dyn Prompter,
    pub package_manager: &'a dyn PackageManager,
    pub catalog: &'a PluginCatalog,
    pub preferred_package_manager: Option<PackageManagerKind>,
}

impl Invoker<'_> {
    /// Install `plugin` and run its generator
    pub async fn add(&self, plugin: &str, options: InvokeOptions) -> Result<Invoked, CreateError> {
        let id = resolve_plugin_id(plugin);
        let manifest = self.read_manifest().await?;
        let package_manager =
            select_package_manager(options.package_manager, self.preferred_package_manager);

        let mut entry = PluginEntry::new(&id);
        entry.version = options.version.clone();
        let mut install_preset = Preset::default();
        install_preset.plugins.push(entry);

        let installer = PluginInstaller {
            catalog: self.catalog,
            package_manager: self.package_manager,
        };
        let installed = installer
            .install(
                &install_preset,
                &self.dir,
                manifest,
                package_manager,
                options.registry.clone(),
            )
            .await?;
        tracing::info!(plugin = %id, "plugin installed");

        self.generate(&id, options, installed.manifest, &installed.baseline, Some(installed.plan))
            .await
    }

    /// Run the generator of a plugin the project already depends on
    pub async fn invoke(&self, plugin: &str, options: InvokeOptions) -> Result<Invoked, CreateError> {
        let id = resolve_plugin_id(plugin);
        let manifest = self.read_manifest().await?;
        if !manifest.all_dependencies().contains_key(&id) {
            return Err(CreateError::generator(
                &id,
                anyhow::anyhow!(
                    "plugin is not installed in {}; use `add` instead",
                    self.dir.display()
                ),
            ));
        }
        self.generate(&id, options, manifest, &Baseline::new(), None)
            .await
    }

    async fn read_manifest(&self) -> Result<Manifest, CreateError> {
        let path = self.dir.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CreateError::io(&path, e))?;
        Manifest::parse(&content).map_err(|e| {
            CreateError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{:#}", e)),
            )
        })
    }

    async fn generate(
        &self,
        id: &str,
        options: InvokeOptions,
        manifest: Manifest,
        baseline: &Baseline,
        installed_plan: Option<InstallationPlan>,
    ) -> Result<Invoked, CreateError> {
        let project_name = manifest.name().unwrap_or_default().to_string();

        let mut preset = Preset::default();
        preset.plugins.push(
            PluginEntry::new(SERVICE).with_option("projectName", project_name.as_str()),
        );
        let mut entry = PluginEntry::new(id);
        entry.options = options.options;
        preset.plugins.push(entry);

        let plugins: Vec<_> = self
            .catalog
            .load(&preset)
            .into_iter()
            .filter(|p| p.id == id)
            .collect();

        let before = manifest.all_dependencies();
        let tree = seed_tree(&self.dir)?;
        tracing::info!(plugin = %id, files = tree.len(), "invoking generator");
        let generation = run_generators_on(tree, &preset, &project_name, &plugins, manifest)?;
        let resolved = generation.tree.resolve()?;

        let plan = ConflictResolver::new(self.prompter, false).plan(resolved, &self.dir, baseline)?;
        let written = write_plan(&plan).await?;

        let installed = installed_plan
            .map(|p| p.project_deps)
            .unwrap_or(before);
        if generation.manifest.all_dependencies() != installed {
            let package_manager =
                select_package_manager(options.package_manager, self.preferred_package_manager);
            let sync =
                InstallationPlan::from_manifest(&generation.manifest, package_manager, options.registry);
            if let Err(e) = self.package_manager.install(&self.dir, &sync).await {
                tracing::warn!(error = %format!("{:#}", e), "dependency sync failed");
            }
        }

        for (plugin, hook) in generation.hooks {
            if let Err(e) = hook(self.dir.as_path()) {
                tracing::warn!(%plugin, error = %format!("{:#}", e), "completion hook failed");
            }
        }

        Ok(Invoked {
            plugin: id.to_string(),
            plan,
            written,
        })
    }
}

/// Tree holding every project file outside dependency and VCS directories
fn seed_tree(dir: &Path) -> Result<VirtualTree, CreateError> {
    let mut tree = VirtualTree::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && IGNORED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            CreateError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if relative == MANIFEST_FILE {
            continue;
        }
        let bytes = std::fs::read(entry.path()).map_err(|e| CreateError::io(entry.path(), e))?;
        tree.seed(&relative, bytes)?;
    }
    Ok(tree)
}
