//! Plugin catalog and the built-in plugins
//!
//! The catalog maps a plugin package name to its generator, the version range
//! installed when a preset does not pin one, and whether the plugin ships
//! inside this binary (bundled plugins are never handed to the package
//! manager).

mod babel;
mod gitignore;
mod router;
mod service;
mod vuex;

use crate::generator::{Generator, GeneratorApi, LoadedPlugin};
use crate::preset::Preset;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The core service plugin, always first in a prepared preset
pub const SERVICE: &str = "@core/cli-service";
/// Bookkeeping plugin writing `.gitignore`, always right after the service
pub const GITIGNORE: &str = "@core/cli-plugin-gitignore";
pub const ROUTER: &str = "@core/cli-plugin-router";
pub const VUEX: &str = "@core/cli-plugin-vuex";
pub const BABEL: &str = "@core/cli-plugin-babel";

/// Version range installed for the built-in plugins
pub const CORE_PLUGIN_VERSION: &str = "~4.5.0";

/// Range used when neither the preset nor the catalog knows a version
pub const FALLBACK_VERSION: &str = "latest";

/// What the catalog knows about one plugin
#[derive(Clone)]
pub struct PluginSpec {
    pub default_version: Option<String>,
    /// Shipped with the binary; nothing to install
    pub bundled: bool,
    pub generator: Arc<dyn Generator>,
}

impl PluginSpec {
    pub fn new<G: Generator + 'static>(generator: G) -> Self {
        Self {
            default_version: None,
            bundled: false,
            generator: Arc::new(generator),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    pub fn bundled(mut self) -> Self {
        self.bundled = true;
        self
    }
}

/// Registry of loadable generators keyed by plugin name
#[derive(Clone, Default)]
pub struct PluginCatalog {
    plugins: BTreeMap<String, PluginSpec>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the core service, gitignore, router, vuex and babel plugins
    pub fn builtin() -> Self {
        Self::new()
            .with(SERVICE, PluginSpec::new(service::generate).version(CORE_PLUGIN_VERSION))
            .with(GITIGNORE, PluginSpec::new(gitignore::generate).bundled())
            .with(ROUTER, PluginSpec::new(router::generate).version(CORE_PLUGIN_VERSION))
            .with(VUEX, PluginSpec::new(vuex::generate).version(CORE_PLUGIN_VERSION))
            .with(BABEL, PluginSpec::new(babel::generate).version(CORE_PLUGIN_VERSION))
    }

    /// Register (or replace) a plugin
    pub fn with(mut self, name: &str, spec: PluginSpec) -> Self {
        self.register(name, spec);
        self
    }

    pub fn register(&mut self, name: &str, spec: PluginSpec) {
        self.plugins.insert(name.to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn is_bundled(&self, name: &str) -> bool {
        self.plugins.get(name).is_some_and(|p| p.bundled)
    }

    pub fn default_version(&self, name: &str) -> Option<&str> {
        self.plugins
            .get(name)
            .and_then(|p| p.default_version.as_deref())
    }

    /// Generators for every plugin of `preset`, in preset order
    ///
    /// A plugin without a registered generator still takes part in the run
    /// with a generator that does nothing.
    pub fn load(&self, preset: &Preset) -> Vec<LoadedPlugin> {
        preset
            .plugins
            .iter()
            .map(|entry| {
                let generator = match self.plugins.get(&entry.name) {
                    Some(spec) => spec.generator.clone(),
                    None => {
                        tracing::warn!(plugin = %entry.name, "no generator registered; plugin only installed");
                        Arc::new(noop) as Arc<dyn Generator>
                    }
                };
                LoadedPlugin {
                    id: entry.name.clone(),
                    options: entry.options.clone(),
                    generator,
                }
            })
            .collect()
    }
}

fn noop(_api: &mut GeneratorApi<'_>) -> anyhow::Result<()> {
    Ok(())
}
