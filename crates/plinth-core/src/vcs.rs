//! Version control collaborator
//!
//! Only what project creation needs: detect git, init a repository and make
//! the initial commit. Every failure here is reported, never fatal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command as TokioCommand;

/// Message of the initial commit when the user gives none
pub const DEFAULT_COMMIT_MESSAGE: &str = "init";

#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Whether `dir` is inside an existing repository
    async fn is_repository(&self, dir: &Path) -> bool;

    async fn init(&self, dir: &Path) -> Result<()>;

    /// Stage everything and commit
    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()>;
}

/// `git` on PATH
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    async fn git(&self, dir: &Path, args: &[&str]) -> Result<()> {
        let output = TokioCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;
        if !output.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn is_available(&self) -> bool {
        TokioCommand::new("git")
            .arg("--version")
            .output()
            .await
            .is_ok_and(|o| o.status.success())
    }

    async fn is_repository(&self, dir: &Path) -> bool {
        // the directory may not exist yet; ask from the closest existing ancestor
        let Some(probe) = dir.ancestors().find(|p| p.is_dir()) else {
            return false;
        };
        self.git(probe, &["status"]).await.is_ok()
    }

    async fn init(&self, dir: &Path) -> Result<()> {
        self.git(dir, &["init"]).await
    }

    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()> {
        self.git(dir, &["add", "-A"]).await?;
        self.git(dir, &["commit", "-m", message, "--no-verify"])
            .await
    }
}

/// Whether project creation should initialize a repository
///
/// An explicit request wins when git is available; otherwise a repository is
/// created unless disabled or the target already lives inside one.
pub async fn should_init_git(
    vcs: &dyn VersionControl,
    target: &Path,
    requested: Option<bool>,
) -> bool {
    if !vcs.is_available().await {
        return false;
    }
    match requested {
        Some(true) => true,
        Some(false) => false,
        None => !vcs.is_repository(target).await,
    }
}
