//! Presets: model, storage, sources and resolution
//!
//! This module provides:
//! - The preset model (`Preset`, `PluginEntry`)
//! - Saved preset stores (rc file, in-memory)
//! - Local and remote preset documents
//! - Feature prompt modules for manual selection
//! - Resolution of user options into exactly one preset

pub mod defaults;
pub mod features;
pub mod model;
pub mod resolve;
pub mod source;
pub mod store;

pub use defaults::{default_preset, DEFAULT_PRESET_NAME};
pub use features::{builtin_prompt_modules, PromptModule};
pub use model::{CssPreprocessor, PluginEntry, PluginList, Preset};
pub use resolve::{is_valid_version, prepare_preset, PresetOptions, PresetResolver};
pub use source::{PresetFetcher, PresetSource, DEFAULT_PRESET_BASE_URL};
pub use store::{MemoryPresetStore, PresetStore, RcPresetStore};
