//! Product configuration trait for CLI binaries
//!
//! The binary implements this trait to give the scaffolding engine its
//! identity: names, where remote presets come from, where the rc file lives
//! and what to tell the user once a project exists.

use crate::install::PackageManagerKind;
use std::path::Path;

/// Configuration trait for a scaffolding CLI product
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Environment variable name for overriding the remote preset base URL
    fn preset_url_env(&self) -> &'static str;

    /// File name of the rc file in the home directory
    fn rc_file_name(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, dir: &Path, package_manager: PackageManagerKind) -> Vec<String>;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
