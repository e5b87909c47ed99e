//! Virtual file tree
//!
//! In-memory staging area every generator writes into. Nothing touches the
//! disk until the whole tree is resolved and the conflict resolver has decided
//! what to do with each path.
//!
//! A path written by a second plugin is combined through merge middleware:
//! the incoming write's own middleware, else the middleware the path was
//! registered with. A second plugin overwriting a path without any middleware
//! replaces the content and is recorded as a [`Clash`].

pub mod inject;
pub mod merge;
pub mod path;
pub mod source;

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub use inject::{ExtensionPoint, ROOT_OPTIONS_ANCHOR};
pub use merge::{deep_merge, AppendLines, JsonMerge, Merge, Middleware};
pub use source::RenderSource;

/// Failures while staging or resolving the tree
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Invalid path \"{path}\": must be relative and stay inside the project")]
    InvalidPath { path: String },

    #[error("Failed to render {path} (written by {plugin})")]
    Render {
        path: String,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to merge content from {plugin} into {path}")]
    Merge {
        path: String,
        plugin: String,
        #[source]
        source: anyhow::Error,
    },
}

impl TreeError {
    /// Plugin the failure is attributed to
    pub fn plugin(&self) -> Option<&str> {
        match self {
            TreeError::InvalidPath { .. } => None,
            TreeError::Render { plugin, .. } | TreeError::Merge { plugin, .. } => Some(plugin),
        }
    }
}

/// Writer recorded for files seeded from an existing project
pub const SEED_OWNER: &str = "existing";

/// Content descriptor of one staged file
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Literal(Vec<u8>),
    /// Rendered with tera against `data` when the tree is resolved
    Template { source: String, data: Value },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Literal(text.into().into_bytes())
    }

    fn render(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Content::Literal(bytes) => Ok(bytes.clone()),
            Content::Template { source, data } => {
                let context = tera::Context::from_value(data.clone())?;
                let rendered = tera::Tera::one_off(source, &context, false)?;
                Ok(rendered.into_bytes())
            }
        }
    }
}

/// Two plugins wrote the same path without merge middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clash {
    pub path: String,
    /// Plugin whose content was replaced
    pub first: String,
    /// Plugin whose content was kept
    pub second: String,
}

struct Contribution {
    plugin: String,
    content: Content,
    merge: Middleware,
}

struct FileEntry {
    owner: String,
    base: Content,
    contributions: Vec<Contribution>,
    middleware: Option<Middleware>,
}

impl FileEntry {
    fn last_writer(&self) -> &str {
        self.contributions
            .last()
            .map_or(self.owner.as_str(), |c| c.plugin.as_str())
    }
}

/// Final content of every path, ready for conflict resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTree {
    pub files: BTreeMap<String, Vec<u8>>,
    pub clashes: Vec<Clash>,
}

#[derive(Default)]
pub struct VirtualTree {
    files: BTreeMap<String, FileEntry>,
    extensions: BTreeMap<String, ExtensionPoint>,
    clashes: Vec<Clash>,
}

impl VirtualTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `content` at `path` on behalf of `plugin`
    pub fn write(
        &mut self,
        plugin: &str,
        path: &str,
        content: Content,
        middleware: Option<Middleware>,
    ) -> Result<(), TreeError> {
        let path = normalize(path)?;

        let Some(entry) = self.files.get_mut(&path) else {
            tracing::debug!(%path, plugin, "staged file");
            self.files.insert(
                path,
                FileEntry {
                    owner: plugin.to_string(),
                    base: content,
                    contributions: Vec::new(),
                    middleware,
                },
            );
            return Ok(());
        };

        if let Some(merge) = middleware.clone().or_else(|| entry.middleware.clone()) {
            tracing::debug!(%path, plugin, "merged into staged file");
            entry.contributions.push(Contribution {
                plugin: plugin.to_string(),
                content,
                merge,
            });
            if entry.middleware.is_none() {
                entry.middleware = middleware;
            }
            return Ok(());
        }

        let previous = entry.last_writer().to_string();
        if previous != plugin && previous != SEED_OWNER {
            tracing::warn!(%path, first = %previous, second = plugin, "plugins overwrote each other");
            self.clashes.push(Clash {
                path: path.clone(),
                first: previous,
                second: plugin.to_string(),
            });
        }
        entry.owner = plugin.to_string();
        entry.base = content;
        entry.contributions.clear();
        Ok(())
    }

    /// Stage a file that already exists in the project
    ///
    /// Seeded files are owned by nobody: a plugin replacing one is not a clash.
    pub fn seed(&mut self, path: &str, bytes: Vec<u8>) -> Result<(), TreeError> {
        let path = normalize(path)?;
        self.files.insert(
            path,
            FileEntry {
                owner: SEED_OWNER.to_string(),
                base: Content::Literal(bytes),
                contributions: Vec::new(),
                middleware: None,
            },
        );
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        normalize(path).is_ok_and(|p| self.files.contains_key(&p))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Plugin that last wrote `path`
    pub fn writer_of(&self, path: &str) -> Option<&str> {
        let path = normalize(path).ok()?;
        self.files.get(&path).map(FileEntry::last_writer)
    }

    pub fn clashes(&self) -> &[Clash] {
        &self.clashes
    }

    pub fn inject_imports<I, S>(&mut self, file: &str, imports: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let point = self.extensions.entry(normalize(file)?).or_default();
        for import in imports {
            point.add_import(import.as_ref());
        }
        Ok(())
    }

    pub fn inject_root_options<I, S>(&mut self, file: &str, options: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let point = self.extensions.entry(normalize(file)?).or_default();
        for option in options {
            point.add_root_option(option.as_ref());
        }
        Ok(())
    }

    pub fn extension_point(&self, file: &str) -> Option<&ExtensionPoint> {
        self.extensions.get(&normalize(file).ok()?)
    }

    /// Render templates, apply merge middleware and extension points
    ///
    /// Pure: the staged tree is left untouched, so resolving twice yields
    /// identical output.
    pub fn resolve(&self) -> Result<ResolvedTree, TreeError> {
        let mut files = BTreeMap::new();

        for (path, entry) in &self.files {
            let mut bytes = entry.base.render().map_err(|source| TreeError::Render {
                path: path.clone(),
                plugin: entry.owner.clone(),
                source,
            })?;

            for contribution in &entry.contributions {
                let incoming = contribution.content.render().map_err(|source| TreeError::Render {
                    path: path.clone(),
                    plugin: contribution.plugin.clone(),
                    source,
                })?;
                bytes = merge_bytes(&bytes, &incoming, contribution.merge.as_ref()).map_err(
                    |source| TreeError::Merge {
                        path: path.clone(),
                        plugin: contribution.plugin.clone(),
                        source,
                    },
                )?;
            }

            files.insert(path.clone(), bytes);
        }

        for (path, point) in &self.extensions {
            let Some(bytes) = files.get_mut(path) else {
                tracing::warn!(%path, "extension point targets a file no plugin rendered");
                continue;
            };
            match std::str::from_utf8(bytes) {
                Ok(text) => *bytes = point.apply(text).into_bytes(),
                Err(_) => tracing::warn!(%path, "extension point targets a binary file"),
            }
        }

        Ok(ResolvedTree {
            files,
            clashes: self.clashes.clone(),
        })
    }
}

fn normalize(path: &str) -> Result<String, TreeError> {
    path::normalize(path).ok_or_else(|| TreeError::InvalidPath {
        path: path.to_string(),
    })
}

fn merge_bytes(current: &[u8], incoming: &[u8], merge: &dyn Merge) -> anyhow::Result<Vec<u8>> {
    let current = std::str::from_utf8(current)
        .map_err(|_| anyhow::anyhow!("current content is not UTF-8 text"))?;
    let incoming = std::str::from_utf8(incoming)
        .map_err(|_| anyhow::anyhow!("incoming content is not UTF-8 text"))?;
    Ok(merge.merge(current, incoming)?.into_bytes())
}
