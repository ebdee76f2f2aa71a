//! The reconciliation plan: the per-run classification of every observed
//! file into four disjoint sets.
//!
//! Invariants:
//! - `new ∪ modified ∪ unchanged` covers every readable file the scanner
//!   observed this run (files that failed to fingerprint are recorded as
//!   failures and belong to no set);
//! - `deleted` is the set of indexed source paths with no file on disk,
//!   and is only populated when auto-delete is enabled.
//!
//! The plan is owned by the coordinator for the duration of one run and
//! never outlives it.

use std::sync::Arc;

use crate::models::{DataSourceDescriptor, FileFingerprint};

/// One present file awaiting processing, with the source that claimed it.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub path: String,
    pub source: Arc<DataSourceDescriptor>,
    /// Present when classification already hashed the file; reused by the
    /// insert phase so no file is hashed twice in one run.
    pub fingerprint: Option<FileFingerprint>,
}

#[derive(Debug, Default)]
pub struct ReconciliationPlan {
    pub new: Vec<PendingFile>,
    pub modified: Vec<PendingFile>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

impl ReconciliationPlan {
    /// Whether any phase has anything to do.
    pub fn has_work(&self) -> bool {
        !self.new.is_empty() || !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Normalize ordering after concurrent classification, so phase
    /// processing and reports are deterministic regardless of hash
    /// completion order.
    pub fn sort(&mut self) {
        self.new.sort_by(|a, b| a.path.cmp(&b.path));
        self.modified.sort_by(|a, b| a.path.cmp(&b.path));
        self.unchanged.sort();
        self.deleted.sort();
    }
}
