//! Target directory preparation

use crate::error::CreateError;
use crate::prompt::{Choice, Prompter};
use std::path::Path;

/// How the user chose to treat an existing target directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Directory does not exist yet
    Fresh,
    /// Existing files stay; generated files go through conflict resolution
    Merge,
    /// Existing directory removed before installation
    Overwrite,
}

/// Make `target` ready for installation
///
/// `force` deletes the existing directory without asking, even when `merge`
/// is also set. This cannot be undone. In the current directory (`in_current`) only its entries are
/// removed.
pub fn prepare_target(
    target: &Path,
    in_current: bool,
    force: bool,
    merge: bool,
    prompter: &dyn Prompter,
) -> Result<TargetMode, CreateError> {
    if !target.exists() {
        return Ok(TargetMode::Fresh);
    }
    if force {
        if merge {
            tracing::warn!("--force takes precedence over --merge");
        }
        tracing::warn!(target = %target.display(), "removing existing directory");
        clear(target, in_current)?;
        return Ok(TargetMode::Overwrite);
    }
    if merge {
        return Ok(TargetMode::Merge);
    }

    if in_current {
        let ok = prompter
            .confirm("Generate project in current directory?", true)
            .map_err(CreateError::Prompt)?;
        if !ok {
            return Err(aborted(target));
        }
        return Ok(TargetMode::Merge);
    }

    if !prompter.is_interactive() {
        tracing::info!(target = %target.display(), "target exists; merging");
        return Ok(TargetMode::Merge);
    }

    let picked = prompter
        .select(
            &format!(
                "Target directory {} already exists. Pick an action:",
                target.display()
            ),
            &[
                Choice::new("overwrite", "Overwrite"),
                Choice::new("merge", "Merge"),
                Choice::new("cancel", "Cancel"),
            ],
        )
        .map_err(CreateError::Prompt)?;

    match picked.as_str() {
        "overwrite" => {
            tracing::info!(target = %target.display(), "removing existing directory");
            clear(target, in_current)?;
            Ok(TargetMode::Overwrite)
        }
        "merge" => Ok(TargetMode::Merge),
        _ => Err(aborted(target)),
    }
}

fn aborted(target: &Path) -> CreateError {
    CreateError::ConflictAborted {
        target: target.to_path_buf(),
    }
}

fn clear(target: &Path, in_current: bool) -> Result<(), CreateError> {
    if !in_current {
        return std::fs::remove_dir_all(target).map_err(|e| CreateError::io(target, e));
    }
    let entries = std::fs::read_dir(target).map_err(|e| CreateError::io(target, e))?;
    for entry in entries {
        let path = entry.map_err(|e| CreateError::io(target, e))?.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| CreateError::io(&path, e))?;
    }
    Ok(())
}
