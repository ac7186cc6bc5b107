use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CodemarksError;

/// File name of the processed-state ledger inside the state directory.
pub const STATE_FILENAME: &str = "state.json";

/// File name of the corpus index snapshot inside the state directory.
pub const SNAPSHOT_FILENAME: &str = "index.json";

/// Shipped `sync.endpoint` value. Sync refuses to run until it is changed.
pub const PLACEHOLDER_ENDPOINT: &str = "https://api.example.com/bookmarks";

/// Default `project.name` value, resolved to the root directory's name.
pub const PROJECT_NAME_PLACEHOLDER: &str = "${rootBasename}";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub markers: MarkersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub deeplink: DeeplinkConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            root: default_root(),
        }
    }
}

fn default_project_name() -> String {
    PROJECT_NAME_PLACEHOLDER.to_string()
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MarkersConfig {
    /// Word-prefix ignore list: a category whose first pattern starts with
    /// one of these prefixes is skipped entirely.
    #[serde(default)]
    pub ignored_words: Vec<String>,
    /// File suffix ignore list, e.g. `[".min.js"]`. Case-sensitive.
    #[serde(default)]
    pub ignored_extensions: Vec<String>,
    /// Category name -> ordered regex pattern list. Categories scan in
    /// name order.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            max_files: default_max_files(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}
fn default_max_files() -> usize {
    5120
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    /// State directory, relative to `project.root`.
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".codemarks")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    PLACEHOLDER_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeeplinkConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl Default for DeeplinkConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
        }
    }
}

fn default_scheme() -> String {
    "windsurf".to_string()
}

impl Config {
    pub fn state_dir(&self) -> PathBuf {
        self.project.root.join(&self.state.dir)
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join(STATE_FILENAME)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.state_dir().join(SNAPSHOT_FILENAME)
    }

    /// Resolve the project name used in export and sync payloads.
    ///
    /// The shipped placeholder resolves to the root directory's name; an
    /// explicit non-empty value is used as-is; an empty value is a
    /// configuration error.
    pub fn resolve_project_name(&self) -> crate::error::Result<String> {
        let name = self.project.name.trim();
        if name == PROJECT_NAME_PLACEHOLDER {
            let root = std::fs::canonicalize(&self.project.root).map_err(|e| {
                CodemarksError::Configuration(format!(
                    "cannot resolve project root {}: {}",
                    self.project.root.display(),
                    e
                ))
            })?;
            return root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    CodemarksError::Configuration(
                        "project root has no directory name; set project.name".to_string(),
                    )
                });
        }
        if name.is_empty() {
            return Err(CodemarksError::Configuration(
                "project.name is empty; set it or remove it to use the root directory name"
                    .to_string(),
            ));
        }
        Ok(name.to_string())
    }

    /// Check that the remote sink is actually configured. Sync fails closed
    /// on the shipped placeholder endpoint or a missing API key, before any
    /// scan or network I/O.
    pub fn validate_sync(&self) -> crate::error::Result<()> {
        let endpoint = self.sync.endpoint.trim();
        if endpoint.is_empty() || endpoint == PLACEHOLDER_ENDPOINT {
            return Err(CodemarksError::Configuration(
                "sync.endpoint is not configured; set it to your remote sink URL".to_string(),
            ));
        }
        if self.sync.api_key.trim().is_empty() {
            return Err(CodemarksError::Configuration(
                "sync.api_key is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate search
    if config.search.max_files == 0 {
        anyhow::bail!("search.max_files must be > 0");
    }

    // Validate sync transport
    if config.sync.timeout_secs == 0 {
        anyhow::bail!("sync.timeout_secs must be > 0");
    }

    // Validate deeplink
    if config.deeplink.scheme.trim().is_empty() {
        anyhow::bail!("deeplink.scheme must not be empty");
    }

    Ok(config)
}
