//! Preset resolution
//!
//! Precedence: inline JSON, then a named preset (saved, local file, remote),
//! then `--default`, then interactive prompts. When both an inline preset and
//! a preset name are supplied the inline preset wins.

use super::defaults::{default_preset, DEFAULT_PRESET_NAME};
use super::features::PromptModule;
use super::model::{PluginEntry, Preset};
use super::source::PresetFetcher;
use super::store::PresetStore;
use crate::error::CreateError;
use crate::plugins::{GITIGNORE, ROUTER, SERVICE, VUEX};
use crate::prompt::{Choice, Prompter};
use semver::VersionReq;
use serde_json::Value;

const MANUAL: &str = "__manual__";

/// How the user asked for a preset
#[derive(Debug, Clone, Default)]
pub struct PresetOptions {
    /// Inline JSON preset (`--inline-preset`)
    pub inline_preset: Option<String>,
    /// Saved preset name, local path or remote reference (`--preset`)
    pub preset: Option<String>,
    /// Use the built-in default preset (`--default`)
    pub default: bool,
}

/// Produces exactly one preset from the user's options
pub struct PresetResolver<'a> {
    pub store: &'a dyn PresetStore,
    pub fetcher: &'a PresetFetcher,
    pub prompter: &'a dyn Prompter,
    pub prompt_modules: &'a [PromptModule],
}

impl PresetResolver<'_> {
    pub async fn resolve(&self, options: &PresetOptions) -> Result<Preset, CreateError> {
        if let Some(inline) = &options.inline_preset {
            if let Some(name) = &options.preset {
                tracing::warn!(preset = %name, "both an inline preset and a preset name given; using the inline preset");
            }
            let preset = Preset::from_json(inline)
                .map_err(|e| CreateError::invalid_preset("inline preset", e))?;
            return Ok(preset);
        }

        if let Some(name) = &options.preset {
            return self.resolve_named(name).await;
        }

        if options.default {
            return self.resolve_named(DEFAULT_PRESET_NAME).await;
        }

        if !self.prompter.is_interactive() {
            tracing::info!("non-interactive run without a preset; using the default preset");
            return self.resolve_named(DEFAULT_PRESET_NAME).await;
        }

        self.prompt_for_preset()
    }

    async fn resolve_named(&self, name: &str) -> Result<Preset, CreateError> {
        let saved = self
            .store
            .load()
            .map_err(|e| CreateError::invalid_preset("saved presets", format!("{:#}", e)))?;
        if let Some(preset) = saved.get(name) {
            tracing::info!(preset = name, "using saved preset");
            return Ok(preset.clone());
        }

        if let Some(result) = self.fetcher.fetch(name).await {
            return result;
        }

        if name == DEFAULT_PRESET_NAME {
            return Ok(default_preset());
        }

        Err(CreateError::PresetNotFound {
            name: name.to_string(),
        })
    }

    fn prompt_for_preset(&self) -> Result<Preset, CreateError> {
        let saved = self
            .store
            .load()
            .map_err(|e| CreateError::invalid_preset("saved presets", format!("{:#}", e)))?;

        let mut choices: Vec<Choice> = saved
            .iter()
            .map(|(name, preset)| Choice::new(name, name).hint(describe(preset)))
            .collect();
        choices.push(Choice::new(MANUAL, "Manually select features"));

        let picked = self
            .prompter
            .select("Please pick a preset", &choices)
            .map_err(CreateError::Prompt)?;

        if picked != MANUAL {
            return saved
                .get(&picked)
                .cloned()
                .ok_or(CreateError::PresetNotFound { name: picked });
        }

        self.prompt_manual().map_err(CreateError::Prompt)
    }

    fn prompt_manual(&self) -> anyhow::Result<Preset> {
        let choices: Vec<Choice> = self.prompt_modules.iter().map(|m| m.choice()).collect();
        let features = self
            .prompter
            .multiselect("Check the features needed for your project", &choices)?;

        let mut preset = Preset::default();
        for module in self.prompt_modules {
            if features.iter().any(|f| f == module.id) {
                (module.apply)(&mut preset, self.prompter)?;
            }
        }

        if !features.is_empty() {
            let placement = self.prompter.select(
                "Where do you prefer placing config for Babel, PostCSS, etc.?",
                &[
                    Choice::new("files", "In dedicated config files"),
                    Choice::new("pkg", "In package.json"),
                ],
            )?;
            preset.use_config_files = placement == "files";
        }

        if self
            .prompter
            .confirm("Save this as a preset for future projects?", false)?
        {
            let name = self.prompter.input("Save preset as:", "")?;
            let name = name.trim();
            if name.is_empty() {
                tracing::warn!("empty preset name; preset not saved");
            } else if let Err(e) = self.store.save(name, &preset) {
                tracing::warn!(preset = name, error = %format!("{:#}", e), "failed to save preset");
            }
        }

        Ok(preset)
    }
}

fn describe(preset: &Preset) -> String {
    preset
        .plugins
        .iter()
        .map(|p| p.name.rsplit('/').next().unwrap_or(&p.name))
        .map(|n| n.trim_start_matches("cli-plugin-"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turn a resolved preset into the one generation runs with
///
/// Legacy `router`/`vuex` flags become plugins, the core service and
/// gitignore generator are prepended when absent, the service receives the
/// project-wide options, and plugin versions are validated.
pub fn prepare_preset(
    mut preset: Preset,
    project_name: &str,
    bare: bool,
) -> Result<Preset, CreateError> {
    for entry in &preset.plugins {
        if let Some(version) = &entry.version {
            if !is_valid_version(version) {
                return Err(CreateError::invalid_preset(
                    "preset",
                    format!("invalid version \"{}\" for plugin \"{}\"", version, entry.name),
                ));
            }
        }
    }

    if preset.router == Some(true) && !preset.plugins.contains(ROUTER) {
        let history = preset.router_history_mode.unwrap_or(false);
        preset
            .plugins
            .push(PluginEntry::new(ROUTER).with_option("historyMode", history));
    }
    if preset.vuex == Some(true) && !preset.plugins.contains(VUEX) {
        preset.plugins.push(PluginEntry::new(VUEX));
    }

    preset.plugins.insert(0, PluginEntry::new(SERVICE));
    let after_service = preset.plugins.position(SERVICE).map_or(0, |i| i + 1);
    preset
        .plugins
        .insert(after_service, PluginEntry::new(GITIGNORE));

    let use_config_files = preset.use_config_files;
    let css = preset.css_preprocessor;
    if let Some(service) = preset.plugins.get_mut(SERVICE) {
        let options = &mut service.options;
        options.insert("projectName".to_string(), Value::from(project_name));
        options.insert("useConfigFiles".to_string(), Value::Bool(use_config_files));
        if let Some(css) = css {
            options.insert("cssPreprocessor".to_string(), Value::from(css.as_str()));
        }
        if bare {
            options.insert("bare".to_string(), Value::Bool(true));
        }
    }

    Ok(preset)
}

/// Accepts npm-style semver ranges and dist-tags
pub fn is_valid_version(version: &str) -> bool {
    let version = version.trim();
    if version.is_empty() {
        return false;
    }
    if is_dist_tag(version) {
        return true;
    }
    version.split("||").all(|range| {
        let range = range.trim();
        if range.is_empty() {
            return false;
        }
        if VersionReq::parse(range).is_ok() {
            return true;
        }
        // npm separates comparators with spaces, semver with commas
        let joined = range.split_whitespace().collect::<Vec<_>>().join(", ");
        VersionReq::parse(&joined).is_ok()
    })
}

fn is_dist_tag(version: &str) -> bool {
    let mut chars = version.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::BABEL;
    use crate::preset::features::builtin_prompt_modules;
    use crate::preset::source::DEFAULT_PRESET_BASE_URL;
    use crate::preset::MemoryPresetStore;
    use crate::prompt::scripted::Scripted;
    use crate::prompt::Unattended;
    use url::Url;

    fn fetcher() -> PresetFetcher {
        PresetFetcher::new(Url::parse(DEFAULT_PRESET_BASE_URL).unwrap(), "plinth-test")
    }

    async fn resolve_with(
        options: PresetOptions,
        store: &MemoryPresetStore,
        prompter: &dyn Prompter,
    ) -> Result<Preset, CreateError> {
        let fetcher = fetcher();
        let modules = builtin_prompt_modules();
        PresetResolver {
            store,
            fetcher: &fetcher,
            prompter,
            prompt_modules: &modules,
        }
        .resolve(&options)
        .await
    }

    #[tokio::test]
    async fn test_inline_preset_wins_over_name() {
        let options = PresetOptions {
            inline_preset: Some(r#"{"plugins":{"@core/cli-plugin-vuex":{}}}"#.to_string()),
            preset: Some("default".to_string()),
            default: false,
        };
        let preset = resolve_with(options, &MemoryPresetStore::new(), &Unattended)
            .await
            .unwrap();
        assert_eq!(preset.plugins.names(), vec![VUEX]);
    }

    #[tokio::test]
    async fn test_malformed_inline_preset() {
        for inline in ["{not json", r#"{"router":true}"#] {
            let options = PresetOptions {
                inline_preset: Some(inline.to_string()),
                ..Default::default()
            };
            let err = resolve_with(options, &MemoryPresetStore::new(), &Unattended)
                .await
                .unwrap_err();
            assert!(matches!(err, CreateError::InvalidPreset { .. }), "{}", inline);
        }
    }

    #[tokio::test]
    async fn test_unknown_saved_preset() {
        let options = PresetOptions {
            preset: Some("nope".to_string()),
            ..Default::default()
        };
        let err = resolve_with(options, &MemoryPresetStore::new(), &Unattended)
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::PresetNotFound { name } if name == "nope"));
    }

    #[tokio::test]
    async fn test_saved_preset_by_name() {
        let mut saved = Preset::default();
        saved.plugins.push(PluginEntry::new(ROUTER));
        let store = MemoryPresetStore::new().with_preset("web", saved.clone());
        let options = PresetOptions {
            preset: Some("web".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_with(options, &store, &Unattended).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_default_flag_and_unattended_fallback() {
        let store = MemoryPresetStore::new();
        let flagged = PresetOptions {
            default: true,
            ..Default::default()
        };
        let from_flag = resolve_with(flagged, &store, &Unattended).await.unwrap();
        let fallback = resolve_with(PresetOptions::default(), &store, &Unattended)
            .await
            .unwrap();
        assert_eq!(from_flag, default_preset());
        assert_eq!(fallback, default_preset());
    }

    #[tokio::test]
    async fn test_manual_selection_and_save() {
        let store = MemoryPresetStore::new();
        // pick manual, features, history mode, config placement, save?, name
        let prompter = Scripted::new(&["__manual__", "babel,router", "yes", "files", "yes", "spa"]);

        let preset = resolve_with(PresetOptions::default(), &store, &prompter)
            .await
            .unwrap();

        assert_eq!(preset.plugins.names(), vec![BABEL, ROUTER]);
        assert!(preset.use_config_files);
        assert_eq!(store.saved().get("spa"), Some(&preset));
    }

    #[tokio::test]
    async fn test_pick_saved_preset_from_prompt() {
        let prompter = Scripted::new(&["default"]);
        let preset = resolve_with(PresetOptions::default(), &MemoryPresetStore::new(), &prompter)
            .await
            .unwrap();
        assert_eq!(preset, default_preset());
        assert_eq!(prompter.asked_count(), 1);
    }

    #[test]
    fn test_prepare_prepends_core_plugins() {
        let preset = Preset::from_json(r#"{"plugins":{"@core/cli-plugin-babel":{}}}"#).unwrap();
        let prepared = prepare_preset(preset, "my-app", false).unwrap();
        assert_eq!(prepared.plugins.names(), vec![SERVICE, GITIGNORE, BABEL]);

        let service = prepared.plugins.get(SERVICE).unwrap();
        assert_eq!(service.options.get("projectName"), Some(&Value::from("my-app")));
        assert!(service.options.get("bare").is_none());
    }

    #[test]
    fn test_prepare_keeps_existing_service_entry() {
        let preset = Preset::from_json(
            r#"{"plugins":{"@core/cli-plugin-babel":{},"@core/cli-service":{"version":"^2.0.0"}}}"#,
        )
        .unwrap();
        let prepared = prepare_preset(preset, "app", true).unwrap();
        assert_eq!(prepared.plugins.names(), vec![BABEL, SERVICE, GITIGNORE]);
        let service = prepared.plugins.get(SERVICE).unwrap();
        assert_eq!(service.version.as_deref(), Some("^2.0.0"));
        assert_eq!(service.options.get("bare"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_prepare_converts_legacy_flags() {
        let preset = Preset::from_json(
            r#"{"plugins":{},"router":true,"routerHistoryMode":true,"vuex":true}"#,
        )
        .unwrap();
        let prepared = prepare_preset(preset, "app", false).unwrap();
        assert_eq!(prepared.plugins.names(), vec![SERVICE, GITIGNORE, ROUTER, VUEX]);
        let router = prepared.plugins.get(ROUTER).unwrap();
        assert_eq!(router.options.get("historyMode"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_prepare_rejects_bad_versions() {
        let preset =
            Preset::from_json(r#"{"plugins":{"x":{"version":"^^1"}}}"#).unwrap();
        let err = prepare_preset(preset, "app", false).unwrap_err();
        assert!(matches!(err, CreateError::InvalidPreset { .. }));
    }

    #[test]
    fn test_version_forms() {
        for ok in ["^1.0.0", "~4.5.0", "1.2.3", "latest", "next", ">=1.0.0 <2.0.0", "^1.0.0 || ^2.0.0", "*"] {
            assert!(is_valid_version(ok), "{}", ok);
        }
        for bad in ["", "^^1", "1.0.0 ||", "!"] {
            assert!(!is_valid_version(bad), "{}", bad);
        }
    }
}
