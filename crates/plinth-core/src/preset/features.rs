//! Feature prompt modules
//!
//! Each module contributes one entry to the "Check the features needed for
//! your project" prompt. When the user picks it, `apply` adds the plugin (and
//! asks any follow-up question) on the preset being built.

use super::model::{CssPreprocessor, PluginEntry, Preset};
use crate::plugins::{BABEL, ROUTER, VUEX};
use crate::prompt::{Choice, Prompter};
use anyhow::Result;

/// A selectable feature of the manual preset prompt
#[derive(Clone)]
pub struct PromptModule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Pre-checked in the feature list
    pub checked: bool,
    pub apply: fn(&mut Preset, &dyn Prompter) -> Result<()>,
}

impl PromptModule {
    pub fn choice(&self) -> Choice {
        Choice::new(self.id, self.name)
            .hint(self.description)
            .selected(self.checked)
    }
}

impl std::fmt::Debug for PromptModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptModule")
            .field("id", &self.id)
            .field("checked", &self.checked)
            .finish()
    }
}

/// The prompt modules shipped with the built-in plugins
pub fn builtin_prompt_modules() -> Vec<PromptModule> {
    vec![
        PromptModule {
            id: "babel",
            name: "Babel",
            description: "Transpile modern JavaScript for older browsers",
            checked: true,
            apply: apply_babel,
        },
        PromptModule {
            id: "router",
            name: "Router",
            description: "Structure the app with dynamic pages",
            checked: false,
            apply: apply_router,
        },
        PromptModule {
            id: "vuex",
            name: "Vuex",
            description: "Manage the app state with a centralized store",
            checked: false,
            apply: apply_vuex,
        },
        PromptModule {
            id: "css-preprocessor",
            name: "CSS Pre-processors",
            description: "Add support for CSS pre-processors like Sass, Less or Stylus",
            checked: false,
            apply: apply_css_preprocessor,
        },
    ]
}

fn apply_babel(preset: &mut Preset, _prompter: &dyn Prompter) -> Result<()> {
    preset.plugins.push(PluginEntry::new(BABEL));
    Ok(())
}

fn apply_router(preset: &mut Preset, prompter: &dyn Prompter) -> Result<()> {
    let history = prompter.confirm(
        "Use history mode for router? (Requires proper server setup for index fallback in production)",
        true,
    )?;
    preset
        .plugins
        .push(PluginEntry::new(ROUTER).with_option("historyMode", history));
    Ok(())
}

fn apply_vuex(preset: &mut Preset, _prompter: &dyn Prompter) -> Result<()> {
    preset.plugins.push(PluginEntry::new(VUEX));
    Ok(())
}

fn apply_css_preprocessor(preset: &mut Preset, prompter: &dyn Prompter) -> Result<()> {
    let choices = [
        CssPreprocessor::DartSass,
        CssPreprocessor::Sass,
        CssPreprocessor::Less,
        CssPreprocessor::Stylus,
    ]
    .iter()
    .map(|p| Choice::new(p.as_str(), css_label(*p)))
    .collect::<Vec<_>>();

    let picked = prompter.select(
        "Pick a CSS pre-processor (PostCSS, Autoprefixer and CSS Modules are supported by default)",
        &choices,
    )?;
    preset.css_preprocessor = Some(
        CssPreprocessor::parse(&picked)
            .ok_or_else(|| anyhow::anyhow!("Unknown CSS pre-processor: {}", picked))?,
    );
    Ok(())
}

fn css_label(p: CssPreprocessor) -> &'static str {
    match p {
        CssPreprocessor::DartSass => "Sass/SCSS (with dart-sass)",
        CssPreprocessor::Sass => "Sass/SCSS (with node-sass)",
        CssPreprocessor::Less => "Less",
        CssPreprocessor::Stylus => "Stylus",
    }
}
