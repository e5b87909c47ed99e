//! Package manager collaborator

use super::InstallationPlan;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Timeout for one install run (10 minutes)
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Installs the dependencies of a project directory
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn install(&self, dir: &Path, plan: &InstallationPlan) -> Result<()>;
}

/// Runs the plan's package manager as a child process
#[derive(Debug, Clone)]
pub struct CommandPackageManager {
    timeout: Duration,
}

impl Default for CommandPackageManager {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }
}

impl CommandPackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PackageManager for CommandPackageManager {
    async fn install(&self, dir: &Path, plan: &InstallationPlan) -> Result<()> {
        let binary = plan.package_manager.binary();
        let args = plan.package_manager.install_args(plan.registry.as_ref());
        let cmd = format!("{} {}", binary, args.join(" "));
        tracing::info!(dir = %dir.display(), command = %cmd, "running package manager");

        let mut child = TokioCommand::new(binary)
            .args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run {}", cmd))?;

        let stdout = child.stdout.take().context("Failed to capture stdout")?;
        let stderr = child.stderr.take().context("Failed to capture stderr")?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        // Stream output until both pipes close
        let output_task = async {
            let mut stdout_open = true;
            let mut stderr_open = true;
            while stdout_open || stderr_open {
                tokio::select! {
                    line = stdout_reader.next_line(), if stdout_open => {
                        match line {
                            Ok(Some(line)) => tracing::info!(target: "plinth::install", "{}", line),
                            Ok(None) => stdout_open = false,
                            Err(e) => {
                                tracing::warn!(error = %e, "error reading package manager stdout");
                                stdout_open = false;
                            }
                        }
                    }
                    line = stderr_reader.next_line(), if stderr_open => {
                        match line {
                            Ok(Some(line)) => tracing::warn!(target: "plinth::install", "{}", line),
                            Ok(None) => stderr_open = false,
                            Err(e) => {
                                tracing::warn!(error = %e, "error reading package manager stderr");
                                stderr_open = false;
                            }
                        }
                    }
                }
            }
        };

        if timeout(self.timeout, output_task).await.is_err() {
            let _ = child.kill().await;
            anyhow::bail!(
                "`{}` timed out after {} seconds",
                cmd,
                self.timeout.as_secs()
            );
        }

        match timeout(Duration::from_secs(30), child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => anyhow::bail!(
                "`{}` failed with exit code: {}",
                cmd,
                status.code().unwrap_or(-1)
            ),
            Ok(Err(e)) => Err(e).with_context(|| format!("Failed to wait for {}", cmd)),
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("`{}` hung after closing its output", cmd);
            }
        }
    }
}
