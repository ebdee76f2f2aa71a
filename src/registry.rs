//! Source registry: resolves configuration into the ordered list of
//! [`DataSourceDescriptor`]s a run operates on.
//!
//! Callers never branch on legacy-vs-multi-source: when no `[sources.<name>]`
//! tables are configured, the legacy `[data]` section is wrapped in a single
//! synthetic descriptor with the default category and priority.

use serde::Serialize;

use crate::config::Config;
use crate::models::DataSourceDescriptor;

/// Name and category assigned to the synthetic legacy descriptor.
const LEGACY_SOURCE_NAME: &str = "default";
const LEGACY_CATEGORY: &str = "default";
const LEGACY_PRIORITY: i64 = 999;

/// Resolve the enabled data sources for one run, in deterministic
/// (alphabetical) order.
pub fn list_sources(config: &Config) -> Vec<DataSourceDescriptor> {
    if config.sources.is_empty() {
        let Some(data) = &config.data else {
            return Vec::new();
        };
        return vec![DataSourceDescriptor {
            name: LEGACY_SOURCE_NAME.to_string(),
            path: data.root.clone(),
            category: LEGACY_CATEGORY.to_string(),
            priority: LEGACY_PRIORITY,
            file_patterns: data.file_patterns.clone(),
            enabled: true,
        }];
    }

    config
        .sources
        .iter()
        .filter(|(_, source)| source.enabled)
        .map(|(name, source)| DataSourceDescriptor {
            name: name.clone(),
            path: source.path.clone(),
            category: source.category.clone(),
            priority: source.priority,
            file_patterns: source.file_patterns.clone(),
            enabled: true,
        })
        .collect()
}

/// Health and configuration status of a single source.
///
/// Serialized as JSON by `csx sources --json`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub category: String,
    pub enabled: bool,
    /// Whether the source root exists on disk.
    pub healthy: bool,
    pub notes: Option<String>,
}

/// Returns the configuration and health status of all known sources,
/// including disabled ones.
pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    let mut all: Vec<DataSourceDescriptor> = list_sources(config);

    // list_sources drops disabled sources; surface them here for visibility.
    for (name, source) in &config.sources {
        if !source.enabled {
            all.push(DataSourceDescriptor {
                name: name.clone(),
                path: source.path.clone(),
                category: source.category.clone(),
                priority: source.priority,
                file_patterns: source.file_patterns.clone(),
                enabled: false,
            });
        }
    }

    all.into_iter()
        .map(|descriptor| {
            let healthy = descriptor.path.is_dir();
            let notes = if healthy {
                Some(format!("root: {}", descriptor.path.display()))
            } else {
                Some("root directory does not exist".to_string())
            };
            SourceStatus {
                name: descriptor.name,
                category: descriptor.category,
                enabled: descriptor.enabled,
                healthy,
                notes,
            }
        })
        .collect()
}
