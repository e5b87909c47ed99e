//! Template sources a generator can render from

use super::path::rename_dotfile;
use anyhow::{Context, Result};
use include_dir::Dir;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Where rendered files come from
#[derive(Debug, Clone)]
pub enum RenderSource {
    /// Template directory compiled into the binary
    Embedded(&'static Dir<'static>),
    /// Template directory on disk, walked recursively
    Directory(PathBuf),
    /// One file with its target path
    File { path: String, contents: Vec<u8> },
}

impl RenderSource {
    pub fn file(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self::File {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Every file of the source as (target path, bytes), sorted by path
    ///
    /// Directory sources apply the dotfile rename rule; single files keep
    /// the path they were given.
    pub fn collect(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = match self {
            RenderSource::Embedded(dir) => {
                let mut files = Vec::new();
                collect_embedded(dir, &mut files);
                files
            }
            RenderSource::Directory(root) => collect_directory(root)?,
            RenderSource::File { path, contents } => {
                return Ok(vec![(path.clone(), contents.clone())]);
            }
        };
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

impl From<&'static Dir<'static>> for RenderSource {
    fn from(dir: &'static Dir<'static>) -> Self {
        Self::Embedded(dir)
    }
}

impl From<PathBuf> for RenderSource {
    fn from(path: PathBuf) -> Self {
        Self::Directory(path)
    }
}

fn collect_embedded(dir: &Dir<'_>, out: &mut Vec<(String, Vec<u8>)>) {
    for file in dir.files() {
        let path = file.path().to_string_lossy().replace('\\', "/");
        out.push((rename_dotfile(&path), file.contents().to_vec()));
    }
    for sub in dir.dirs() {
        collect_embedded(sub, out);
    }
}

fn collect_directory(root: &PathBuf) -> Result<Vec<(String, Vec<u8>)>> {
    if !root.is_dir() {
        anyhow::bail!("Template directory not found: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to walk template directory {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
        let path = relative.to_string_lossy().replace('\\', "/");
        let contents = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        files.push((rename_dotfile(&path), contents));
    }
    Ok(files)
}
