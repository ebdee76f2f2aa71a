//! Error taxonomy for the synchronization engine.
//!
//! Errors split into two tiers. File-level errors ([`SyncError::FileUnreadable`],
//! [`SyncError::IndexOperation`]) are recovered inside a run and recorded in the
//! [`SyncReport`](crate::report::SyncReport); infrastructure-level errors
//! ([`SyncError::InvalidConfig`], [`SyncError::IndexUnavailable`]) abort the run
//! before or mid-way and propagate to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for engine operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A configured source root does not exist. Recoverable: the source is
    /// treated as empty and the run continues.
    #[error("source root does not exist: {path}")]
    SourceUnavailable { path: PathBuf },

    /// A file could not be loaded or hashed. Recoverable per file.
    #[error("unreadable file {path}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    /// A single add/delete call against the document index failed.
    /// Recoverable per file, but escalates to [`SyncError::IndexUnavailable`]
    /// after a run of consecutive failures.
    #[error("index operation failed for {path}: {source}")]
    IndexOperation {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The document index itself appears unreachable. Fatal: aborts the run.
    #[error("document index unavailable: {0}")]
    IndexUnavailable(String),

    /// Malformed configuration. Fatal, raised before any scanning begins.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Whether this error counts toward the consecutive index-failure
    /// escalation threshold.
    pub fn is_index_failure(&self) -> bool {
        matches!(self, SyncError::IndexOperation { .. })
    }
}
