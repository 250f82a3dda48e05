use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Where raw data comes from: an http(s) URL, a file path, or a
    /// `ckan-package:<id>` catalog reference.
    pub descriptor: String,
    /// Base directory for resolving relative file descriptors.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    /// Prefer the resource with exactly this id.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Prefer the first resource whose name contains this (case-insensitive).
    #[serde(default)]
    pub resource_name: Option<String>,
    /// When false, sync the package metadata itself instead of resolving a
    /// resource to row-level data.
    #[serde(default)]
    pub fetch_resource: bool,
    #[serde(default = "default_datastore_limit")]
    pub datastore_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            resource_id: None,
            resource_name: None,
            fetch_resource: false,
            datastore_limit: default_datastore_limit(),
        }
    }
}

fn default_catalog_base_url() -> String {
    "https://ckan0.cf.opendata.inter.prod-toronto.ca".to_string()
}
fn default_datastore_limit() -> u32 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Cap on the ranked list exposed in a response (scoring still sees all
    /// matches).
    #[serde(default = "default_match_limit")]
    pub match_limit: usize,
    /// Newest-first scan window for a query.
    #[serde(default = "default_max_scan_rows")]
    pub max_scan_rows: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_limit: default_match_limit(),
            max_scan_rows: default_max_scan_rows(),
        }
    }
}

fn default_match_limit() -> usize {
    25
}
fn default_max_scan_rows() -> i64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.source.descriptor.trim().is_empty() {
        anyhow::bail!("source.descriptor must not be empty");
    }

    if config.source.fetch_timeout_secs == 0 {
        anyhow::bail!("source.fetch_timeout_secs must be > 0");
    }

    if config.sync.interval_secs == 0 {
        anyhow::bail!("sync.interval_secs must be > 0");
    }

    if config.search.match_limit == 0 {
        anyhow::bail!("search.match_limit must be >= 1");
    }

    if config.search.max_scan_rows < 1 {
        anyhow::bail!("search.max_scan_rows must be >= 1");
    }

    if config.catalog.base_url.trim_end_matches('/').is_empty() {
        anyhow::bail!("catalog.base_url must not be empty");
    }

    Ok(config)
}
