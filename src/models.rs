//! Core data models used throughout corpus-sync.
//!
//! These types represent the configured sources, per-file fingerprints, and
//! tagged chunks that flow through the scan → classify → reconcile pipeline.

use serde::Serialize;
use std::path::PathBuf;

/// A configured data source: one filesystem root whose files are ingested
/// under a shared category and priority.
///
/// Constructed once from configuration at synchronization start and immutable
/// for the duration of a run.
#[derive(Debug, Clone)]
pub struct DataSourceDescriptor {
    /// Unique source name (the `[sources.<name>]` table key).
    pub name: String,
    /// Filesystem root scanned for files.
    pub path: PathBuf,
    /// Category label attached to every chunk from this source.
    pub category: String,
    /// Priority metadata (lower = higher precedence). Carried through chunk
    /// metadata verbatim; never used to order processing.
    pub priority: i64,
    /// Glob patterns selecting files under the root. Bare patterns (no `/`)
    /// match file names anywhere under the root.
    pub file_patterns: Vec<String>,
    /// Disabled sources are skipped by the registry.
    pub enabled: bool,
}

/// Snapshot of one file at scan time: identity plus change-detection signals.
///
/// Never persisted directly; compared against metadata already attached to
/// indexed chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Normalized absolute path.
    pub path: String,
    /// Hex SHA-256 of the file's bytes. Authoritative change signal.
    pub content_hash: String,
    /// Modification time, unix seconds. Advisory only.
    pub mtime: i64,
    /// File size in bytes. Advisory only.
    pub byte_size: i64,
}

/// The metadata the engine reads from and writes to the document index.
///
/// Every chunk of the same source file carries identical
/// `content_hash`/`mtime`/`byte_size` (they describe the file, not the chunk)
/// but a unique `chunk_id`. This record is the wire contract with the index:
/// change detection on the next run depends on these fields surviving
/// verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedChunkMetadata {
    pub chunk_id: String,
    pub source_path: String,
    pub content_hash: String,
    pub mtime: i64,
    pub byte_size: i64,
    pub category: String,
    pub data_source_name: String,
    pub priority: i64,
}

/// A chunk of file content with its metadata attached, ready for the index.
#[derive(Debug, Clone)]
pub struct TaggedChunk {
    pub meta: IndexedChunkMetadata,
    /// Position of this chunk within its source file, starting at 0.
    pub chunk_index: i64,
    pub text: String,
}

/// Classification of one present file relative to the index.
///
/// Files missing from the filesystem but known to the index form the separate
/// deleted set; see [`ReconciliationPlan`](crate::plan::ReconciliationPlan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    New,
    Modified,
    Unchanged,
}
