//! Generator API and the generation pass
//!
//! Each plugin's generator receives a [`GeneratorApi`]: a capability object
//! scoped to that plugin. It can stage files, merge into the manifest,
//! contribute to extension points and register completion hooks, but it never
//! sees the disk or replaces shared state.
//!
//! Generators run in preset order. A failing generator aborts the pass; the
//! staged tree and manifest are dropped with it.

pub mod config_files;
pub mod manifest;

use crate::error::CreateError;
use crate::plugins::SERVICE;
use crate::preset::Preset;
use crate::tree::{Content, JsonMerge, Middleware, RenderSource, VirtualTree};
use anyhow::Result;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub use config_files::extract_config_files;
pub use manifest::{Manifest, MANIFEST_FILE};

/// Writer recorded in the tree for the rendered manifest
pub const MANIFEST_OWNER: &str = "package-manifest";

/// Contract every plugin generator implements
pub trait Generator: Send + Sync {
    fn generate(&self, api: &mut GeneratorApi<'_>) -> Result<()>;
}

impl<F> Generator for F
where
    F: Fn(&mut GeneratorApi<'_>) -> Result<()> + Send + Sync,
{
    fn generate(&self, api: &mut GeneratorApi<'_>) -> Result<()> {
        self(api)
    }
}

/// Callback run after the project has been written
pub type CompletionHook = Box<dyn FnOnce(&Path) -> Result<()> + Send>;

/// A plugin ready to run: its preset options plus the loaded generator
#[derive(Clone)]
pub struct LoadedPlugin {
    pub id: String,
    pub options: Map<String, Value>,
    pub generator: Arc<dyn Generator>,
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin").field("id", &self.id).finish()
    }
}

/// Capability object handed to one plugin's generator
pub struct GeneratorApi<'a> {
    id: &'a str,
    options: &'a Map<String, Value>,
    preset: &'a Preset,
    project_name: &'a str,
    tree: &'a mut VirtualTree,
    manifest: &'a mut Manifest,
    hooks: &'a mut Vec<(String, CompletionHook)>,
}

impl<'a> GeneratorApi<'a> {
    /// Plugin package name
    pub fn id(&self) -> &str {
        self.id
    }

    /// Options the preset gave this plugin
    pub fn options(&self) -> &Map<String, Value> {
        self.options
    }

    /// Options of the core service plugin, shared by every plugin
    pub fn root_options(&self) -> Map<String, Value> {
        self.preset
            .plugins
            .get(SERVICE)
            .map(|s| s.options.clone())
            .unwrap_or_default()
    }

    pub fn project_name(&self) -> &str {
        self.project_name
    }

    pub fn preset(&self) -> &Preset {
        self.preset
    }

    /// Whether the preset selects a plugin, or the manifest already depends on it
    pub fn has_plugin(&self, name: &str) -> bool {
        self.preset.has_plugin(name) || self.manifest.all_dependencies().contains_key(name)
    }

    /// Whether a path is already staged
    pub fn has_file(&self, path: &str) -> bool {
        self.tree.contains(path)
    }

    /// Config should go to dedicated files instead of the manifest
    pub fn extract_config_files(&self) -> bool {
        self.preset.use_config_files
    }

    /// Stage every file of `source`, rendering text files as templates with `data`
    ///
    /// `middleware`, when given, merges later writes to the same paths
    /// instead of letting them overwrite.
    pub fn render(
        &mut self,
        source: impl Into<RenderSource>,
        data: Value,
        middleware: Option<Middleware>,
    ) -> Result<()> {
        let data = self.template_data(data)?;
        for (path, bytes) in source.into().collect()? {
            let content = match String::from_utf8(bytes) {
                Ok(text) => Content::Template {
                    source: text,
                    data: data.clone(),
                },
                Err(e) => Content::Literal(e.into_bytes()),
            };
            self.tree
                .write(self.id, &path, content, middleware.clone())?;
        }
        Ok(())
    }

    /// Deep merge `fields` into the shared manifest
    pub fn extend_package(&mut self, fields: Value) -> Result<()> {
        self.manifest.extend(fields)
    }

    pub fn inject_imports<I, S>(&mut self, file: &str, imports: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.tree.inject_imports(file, imports)?)
    }

    pub fn inject_root_options<I, S>(&mut self, file: &str, options: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.tree.inject_root_options(file, options)?)
    }

    /// Run `hook` with the project directory once files are on disk
    pub fn on_create_complete<F>(&mut self, hook: F)
    where
        F: FnOnce(&Path) -> Result<()> + Send + 'static,
    {
        self.hooks.push((self.id.to_string(), Box::new(hook)));
    }

    fn template_data(&self, data: Value) -> Result<Value> {
        let mut base = Map::new();
        base.insert("options".to_string(), Value::Object(self.options.clone()));
        base.insert("rootOptions".to_string(), Value::Object(self.root_options()));
        base.insert("projectName".to_string(), Value::from(self.project_name));
        base.insert(
            "plugins".to_string(),
            Value::from(self.preset.plugins.names()),
        );
        match data {
            Value::Object(extra) => base.extend(extra),
            Value::Null => {}
            other => anyhow::bail!("template data must be a JSON object, got {}", other),
        }
        Ok(Value::Object(base))
    }
}

/// Everything one generation pass produced
pub struct Generation {
    pub tree: VirtualTree,
    pub manifest: Manifest,
    pub hooks: Vec<(String, CompletionHook)>,
}

/// Run every plugin's generator in order, then stage config files and the manifest
pub fn run_generators(
    preset: &Preset,
    project_name: &str,
    plugins: &[LoadedPlugin],
    manifest: Manifest,
) -> Result<Generation, CreateError> {
    run_generators_on(VirtualTree::new(), preset, project_name, plugins, manifest)
}

/// Like [`run_generators`], starting from a tree already holding project files
pub fn run_generators_on(
    mut tree: VirtualTree,
    preset: &Preset,
    project_name: &str,
    plugins: &[LoadedPlugin],
    mut manifest: Manifest,
) -> Result<Generation, CreateError> {
    let mut hooks = Vec::new();

    for plugin in plugins {
        tracing::info!(plugin = %plugin.id, "invoking generator");
        let mut api = GeneratorApi {
            id: &plugin.id,
            options: &plugin.options,
            preset,
            project_name,
            tree: &mut tree,
            manifest: &mut manifest,
            hooks: &mut hooks,
        };
        plugin
            .generator
            .generate(&mut api)
            .map_err(|e| CreateError::generator(&plugin.id, e))?;
    }

    if preset.use_config_files {
        let extracted = extract_config_files(&mut manifest, &mut tree)
            .map_err(|e| CreateError::generator(config_files::CONFIG_FILES_OWNER, e.into()))?;
        tracing::debug!(?extracted, "extracted config files");
    }

    let merge: Middleware = Arc::new(JsonMerge);
    tree.write(
        MANIFEST_OWNER,
        MANIFEST_FILE,
        Content::text(manifest.to_json()),
        Some(merge),
    )
    .map_err(|e| CreateError::generator(MANIFEST_OWNER, e.into()))?;

    Ok(Generation {
        tree,
        manifest,
        hooks,
    })
}
