use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::SyncError;
use crate::models::DataSourceDescriptor;

/// Expand one source descriptor into the set of normalized absolute paths it
/// currently covers.
///
/// A missing root is not an error: it yields an empty set and a warning, so
/// the remaining sources still get processed. Unreadable directory entries
/// are skipped the same way.
pub fn scan(descriptor: &DataSourceDescriptor) -> Result<BTreeSet<String>> {
    let mut paths = BTreeSet::new();

    let root = match descriptor.path.canonicalize() {
        Ok(root) => root,
        Err(_) => {
            let unavailable = SyncError::SourceUnavailable {
                path: descriptor.path.clone(),
            };
            warn!(source = %descriptor.name, "{}, treating as empty", unavailable);
            return Ok(paths);
        }
    };

    let include_set = build_globset(&descriptor.file_patterns)?;

    for entry in WalkDir::new(&root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(source = %descriptor.name, "skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&root).unwrap_or(path);
        if !include_set.is_match(relative) {
            continue;
        }

        paths.insert(path.to_string_lossy().to_string());
    }

    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        // Bare patterns like "*.txt" apply to file names anywhere under the
        // root, not just the top level.
        let expanded = if pattern.contains('/') {
            pattern.clone()
        } else {
            format!("**/{}", pattern)
        };
        builder.add(Glob::new(&expanded)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn descriptor(root: &Path, patterns: &[&str]) -> DataSourceDescriptor {
        DataSourceDescriptor {
            name: "test".to_string(),
            path: root.to_path_buf(),
            category: "general".to_string(),
            priority: 999,
            file_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            enabled: true,
        }
    }

    #[test]
    fn test_bare_pattern_matches_recursively() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::create_dir_all(tmp.path().join("sub/deep")).unwrap();
        fs::write(tmp.path().join("sub/deep/b.txt"), "b").unwrap();
        fs::write(tmp.path().join("sub/c.md"), "c").unwrap();

        let paths = scan(&descriptor(tmp.path(), &["*.txt"])).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.ends_with(".txt")));
    }

    #[test]
    fn test_multiple_patterns_deduplicate() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();

        // both patterns match the same file once
        let paths = scan(&descriptor(tmp.path(), &["*.txt", "a.*"])).unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_missing_root_yields_empty_set() {
        let paths = scan(&descriptor(Path::new("/nonexistent/corpus-sync-test"), &["*.txt"]))
            .unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_paths_are_absolute() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();

        let paths = scan(&descriptor(tmp.path(), &["*.txt"])).unwrap();
        assert!(paths.iter().all(|p| Path::new(p).is_absolute()));
    }

    #[test]
    fn test_slash_pattern_is_anchored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("notes")).unwrap();
        fs::write(tmp.path().join("notes/a.txt"), "a").unwrap();
        fs::write(tmp.path().join("a.txt"), "top").unwrap();

        let paths = scan(&descriptor(tmp.path(), &["notes/*.txt"])).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.iter().next().unwrap().contains("notes"));
    }
}
