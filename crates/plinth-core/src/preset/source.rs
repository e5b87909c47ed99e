//! Preset documents loaded from a local file or fetched from a remote repository
//!
//! Remote shorthand `owner/repo[#branch]` resolves against a raw-content base
//! URL (GitHub by default, overridable per product through an env var). A
//! full http(s) URL is used as-is when it ends in `.json`, otherwise
//! `preset.json` is appended.

use super::model::Preset;
use crate::error::CreateError;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Default base for `owner/repo` preset shorthands
pub const DEFAULT_PRESET_BASE_URL: &str = "https://raw.githubusercontent.com";

/// File looked up inside preset directories and repositories
pub const PRESET_FILE: &str = "preset.json";

/// Where a named preset lives, when it is not a saved one
#[derive(Debug, Clone, PartialEq)]
pub enum PresetSource {
    Remote(Url),
    Local(PathBuf),
}

impl PresetSource {
    /// Classify a preset name. `None` means it can only be a saved preset.
    pub fn parse(name: &str, base: &Url) -> Option<Self> {
        if is_local_path(name) {
            return Some(Self::Local(expand_home(name)));
        }

        if name.starts_with("http://") || name.starts_with("https://") {
            let url = Url::parse(name).ok()?;
            if url.path().ends_with(".json") {
                return Some(Self::Remote(url));
            }
            return build_url(&url, &[PRESET_FILE]).ok().map(Self::Remote);
        }

        let (repo, branch) = match name.split_once('#') {
            Some((repo, branch)) if !branch.is_empty() => (repo, branch),
            _ => (name, "HEAD"),
        };
        let mut parts = repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                build_url(base, &[owner, repo, branch, PRESET_FILE])
                    .ok()
                    .map(Self::Remote)
            }
            _ => None,
        }
    }
}

fn is_local_path(name: &str) -> bool {
    name.starts_with('.')
        || name.starts_with('/')
        || name.starts_with('~')
        || name.ends_with(".json")
        || name.ends_with(".yaml")
        || name.ends_with(".yml")
}

fn expand_home(name: &str) -> PathBuf {
    match name.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(name)),
        None => PathBuf::from(name),
    }
}

/// Build a URL by appending path segments, preserving query parameters
fn build_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("URL cannot have path segments: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Parse a preset document; YAML when the path says so, JSON otherwise
pub fn parse_preset(content: &str, origin: &str) -> Result<Preset, CreateError> {
    let parsed = if origin.ends_with(".yaml") || origin.ends_with(".yml") {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| CreateError::invalid_preset(origin, reason))
}

/// Loads presets from disk or over HTTP
pub struct PresetFetcher {
    base: Url,
    client: reqwest::Client,
}

impl PresetFetcher {
    /// Create a fetcher with a custom base URL and user agent
    pub fn new(base: Url, user_agent: &str) -> Self {
        Self {
            base,
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a fetcher from a product config, honoring its base URL env override
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = std::env::var(config.preset_url_env())
            .unwrap_or_else(|_| DEFAULT_PRESET_BASE_URL.to_string());
        let base =
            Url::parse(&url_str).with_context(|| format!("Invalid preset URL: {}", url_str))?;
        Ok(Self::new(base, config.user_agent()))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Load the preset a name points at, or `None` if the name is not a path or remote reference
    pub async fn fetch(&self, name: &str) -> Option<Result<Preset, CreateError>> {
        let source = PresetSource::parse(name, &self.base)?;
        Some(match source {
            PresetSource::Local(path) => self.load_local(name, &path).await,
            PresetSource::Remote(url) => self.fetch_remote(name, &url).await,
        })
    }

    async fn load_local(&self, name: &str, path: &Path) -> Result<Preset, CreateError> {
        let file = if path.is_dir() {
            path.join(PRESET_FILE)
        } else {
            path.to_path_buf()
        };
        let content = match tokio::fs::read_to_string(&file).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "local preset unreadable");
                return Err(CreateError::PresetNotFound {
                    name: name.to_string(),
                });
            }
        };
        parse_preset(&content, &file.display().to_string())
    }

    async fn fetch_remote(&self, name: &str, url: &Url) -> Result<Preset, CreateError> {
        let not_found = || CreateError::PresetNotFound {
            name: name.to_string(),
        };

        tracing::info!(%url, "fetching remote preset");
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "failed to fetch remote preset");
                return Err(not_found());
            }
        };

        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "remote preset unavailable");
            return Err(not_found());
        }

        let content = response.text().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "failed to read remote preset");
            not_found()
        })?;
        parse_preset(&content, url.as_str())
    }
}
