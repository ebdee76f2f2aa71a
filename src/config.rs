use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::SyncError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Legacy single-directory mode, used when no `[sources.<name>]` tables
    /// are configured.
    #[serde(default)]
    pub data: Option<LegacyDataConfig>,
    /// Multi-source mode: one table per source, keyed by source name.
    /// BTreeMap keeps registry iteration order deterministic.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Files larger than this are rejected as unreadable rather than
    /// truncated.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    150
}
fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Remove indexed chunks whose source file no longer exists.
    #[serde(default = "default_true")]
    pub auto_delete_missing_files: bool,
    /// When disabled, previously-indexed files are treated as unchanged
    /// without hashing; new and deleted files are still handled.
    #[serde(default = "default_true")]
    pub enable_file_monitoring: bool,
    /// Fan-out width of the concurrent execution strategy.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Abort the run after this many consecutive index operation failures.
    #[serde(default = "default_failure_limit")]
    pub max_consecutive_index_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_delete_missing_files: default_true(),
            enable_file_monitoring: default_true(),
            workers: default_workers(),
            max_consecutive_index_failures: default_failure_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_workers() -> usize {
    8
}
fn default_failure_limit() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LegacyDataConfig {
    pub root: PathBuf,
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_file_patterns() -> Vec<String> {
    vec!["*.txt".to_string(), "*.md".to_string()]
}

fn default_priority() -> i64 {
    999
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

/// Structural validation. Runs before any scanning; a failure here is fatal.
pub fn validate(config: &Config) -> Result<(), SyncError> {
    if config.chunking.chunk_size == 0 {
        return Err(SyncError::InvalidConfig(
            "chunking.chunk_size must be > 0".to_string(),
        ));
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        return Err(SyncError::InvalidConfig(
            "chunking.overlap must be smaller than chunking.chunk_size".to_string(),
        ));
    }
    if config.sync.workers == 0 {
        return Err(SyncError::InvalidConfig(
            "sync.workers must be >= 1".to_string(),
        ));
    }
    if config.sources.is_empty() && config.data.is_none() {
        return Err(SyncError::InvalidConfig(
            "no data sources configured: add [sources.<name>] tables or a legacy [data] section"
                .to_string(),
        ));
    }

    for (name, source) in &config.sources {
        if source.path.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig(format!(
                "source '{}' has an empty path",
                name
            )));
        }
        if source.category.trim().is_empty() {
            return Err(SyncError::InvalidConfig(format!(
                "source '{}' has an empty category",
                name
            )));
        }
        if source.file_patterns.is_empty() {
            return Err(SyncError::InvalidConfig(format!(
                "source '{}' has no file patterns",
                name
            )));
        }
        validate_patterns(name, &source.file_patterns)?;
    }

    if let Some(data) = &config.data {
        if data.root.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig(
                "data.root must not be empty".to_string(),
            ));
        }
        validate_patterns("data", &data.file_patterns)?;
    }

    Ok(())
}

fn validate_patterns(name: &str, patterns: &[String]) -> Result<(), SyncError> {
    for pattern in patterns {
        globset::Glob::new(pattern).map_err(|e| {
            SyncError::InvalidConfig(format!("source '{}': bad pattern '{}': {}", name, pattern, e))
        })?;
    }
    Ok(())
}
