//! Plinth Core - Preset-driven project scaffolding with plugin generators
//!
//! A project is described by a preset: an ordered list of plugins with their
//! options. Creating it installs the plugins, lets every plugin's generator
//! stage files into an in-memory tree, resolves that tree against what is
//! already on disk and only then writes anything.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Building blocks** - presets, the virtual tree, the Generator API,
//!   the installer and the conflict resolver
//! - **Layer 2: Orchestration** - `ProductConfig` trait, [`Creator`] state machine
//!   and [`Invoker`] for single plugins
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use plinth_core::{Collaborators, CreateOptions, Creator};
//!
//! let mut creator = Creator::new("my-app", &cwd, Collaborators {
//!     prompter: &Unattended,
//!     store: &store,
//!     fetcher: &fetcher,
//!     package_manager: &CommandPackageManager::new(),
//!     vcs: &GitCli,
//! });
//! let created = creator.create(CreateOptions::default()).await?;
//! ```

pub mod config;
pub mod conflict;
pub mod creator;
pub mod error;
pub mod generator;
pub mod install;
pub mod invoke;
pub mod plugins;
pub mod preset;
pub mod product;
pub mod prompt;
pub mod tree;
pub mod vcs;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use conflict::{ConflictAction, ConflictResolver, WritePlan};
pub use creator::{Collaborators, CreateOptions, Created, Creator, Stage};
pub use error::CreateError;
pub use generator::{Generator, GeneratorApi, Manifest};
pub use install::{CommandPackageManager, PackageManager, PackageManagerKind};
pub use invoke::{InvokeOptions, Invoker};
pub use plugins::{PluginCatalog, PluginSpec};
pub use preset::{PluginEntry, Preset, PresetOptions};
pub use product::ProductConfig;
pub use prompt::{Prompter, Unattended};
pub use vcs::{GitCli, VersionControl};

#[cfg(feature = "tui")]
pub use tui::run;
