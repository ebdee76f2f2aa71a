//! Per-run sync reporting.
//!
//! A [`SyncReport`] is created at the start of a run, appended to as files
//! are processed, and returned to the caller even when individual files
//! failed. It is never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SyncError;
use crate::plan::ReconciliationPlan;

/// What the engine was doing with a file when the outcome was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Hashing a previously-indexed file during classification.
    Fingerprint,
    /// Removing chunks for a file that disappeared from its source.
    Delete,
    /// Re-indexing a modified file (delete of old chunks, insert of new).
    Update,
    /// Indexing a file seen for the first time.
    Insert,
}

/// Outcome for one file that was actually processed.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub action: SyncAction,
    /// `None` on success.
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,

    /// Classification counts (files attempted, not files that succeeded).
    pub new: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,

    pub files_indexed: usize,
    pub files_failed: usize,
    pub chunks_inserted: u64,
    pub chunks_deleted: u64,
    pub rebuild_triggered: bool,

    pub outcomes: Vec<FileOutcome>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            dry_run,
            new: 0,
            modified: 0,
            deleted: 0,
            unchanged: 0,
            files_indexed: 0,
            files_failed: 0,
            chunks_inserted: 0,
            chunks_deleted: 0,
            rebuild_triggered: false,
            outcomes: Vec::new(),
        }
    }

    pub fn set_counts(&mut self, plan: &ReconciliationPlan) {
        self.new = plan.new.len();
        self.modified = plan.modified.len();
        self.deleted = plan.deleted.len();
        self.unchanged = plan.unchanged.len();
    }

    pub fn record_success(&mut self, path: &str, action: SyncAction) {
        if matches!(action, SyncAction::Insert | SyncAction::Update) {
            self.files_indexed += 1;
        }
        self.outcomes.push(FileOutcome {
            path: path.to_string(),
            action,
            error: None,
        });
    }

    pub fn record_failure(&mut self, path: &str, action: SyncAction, error: &SyncError) {
        self.files_failed += 1;
        self.outcomes.push(FileOutcome {
            path: path.to_string(),
            action,
            error: Some(error.to_string()),
        });
    }

    /// Whether this run mutated the index at all. Drives the downstream
    /// rebuild signal: a no-op run must not trigger a rebuild.
    pub fn changed(&self) -> bool {
        self.chunks_inserted > 0 || self.chunks_deleted > 0
    }

    /// Plain-text summary for the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mode = if self.dry_run { " (dry-run)" } else { "" };
        out.push_str(&format!("sync {}{}\n", self.run_id, mode));
        out.push_str(&format!(
            "  new: {}  modified: {}  deleted: {}  unchanged: {}\n",
            self.new, self.modified, self.deleted, self.unchanged
        ));
        if !self.dry_run {
            out.push_str(&format!("  files indexed: {}\n", self.files_indexed));
            out.push_str(&format!("  chunks inserted: {}\n", self.chunks_inserted));
            out.push_str(&format!("  chunks deleted: {}\n", self.chunks_deleted));
            out.push_str(&format!(
                "  rebuild: {}\n",
                if self.rebuild_triggered {
                    "triggered"
                } else {
                    "skipped"
                }
            ));
        }
        if self.files_failed > 0 {
            out.push_str(&format!("  failures: {}\n", self.files_failed));
            for outcome in self.outcomes.iter().filter(|o| o.error.is_some()) {
                out.push_str(&format!(
                    "    ✗ {} ({:?}): {}\n",
                    outcome.path,
                    outcome.action,
                    outcome.error.as_deref().unwrap_or("unknown")
                ));
            }
        }
        out.push_str("ok\n");
        out
    }
}
