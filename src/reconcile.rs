//! Reconciliation coordinator: the state machine that drives one sync run.
//!
//! A run executes four phases, always in this order:
//!
//! 1. **Delete** — remove chunks for files that disappeared from their
//!    sources (when auto-delete is enabled).
//! 2. **Update** — remove the old chunks of every modified file.
//!    Delete-then-insert instead of in-place mutation: a file whose chunk
//!    count shrinks across an edit would otherwise leave orphaned chunks.
//! 3. **Insert** — chunk, tag, and index new files plus the post-delete
//!    remainder of the update phase. The first population of an empty index
//!    is submitted as one batched add.
//! 4. **Rebuild signal** — notify downstream consumers once, and only if
//!    some phase actually mutated the index.
//!
//! Phases are strictly sequential: later phases depend on the post-delete
//! state of the index. Within a phase, file-level work has no mutual
//! ordering and may fan out concurrently. Each file is a failure-isolation
//! boundary; only infrastructure failures (unreachable index, invalid
//! configuration) abort the run.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::chunker::Chunker;
use crate::config::Config;
use crate::detect;
use crate::error::{SyncError, SyncResult};
use crate::loader::ContentLoader;
use crate::models::{DataSourceDescriptor, FileClass, IndexedChunkMetadata, TaggedChunk};
use crate::plan::{PendingFile, ReconciliationPlan};
use crate::report::{SyncAction, SyncReport};
use crate::scanner;
use crate::store::{DocumentIndex, MetadataFilter};
use crate::tagger;

/// How file-level work within one phase is executed.
///
/// Both strategies share the same classification and ordering logic; the
/// concurrent one fans file tasks out to a bounded cooperative task set and
/// collects them before the phase completes.
#[derive(Debug, Clone, Copy)]
pub enum ExecutionStrategy {
    Sequential,
    Concurrent { workers: usize },
}

impl ExecutionStrategy {
    async fn run_phase<T, F, Fut, O>(&self, items: Vec<T>, task: F) -> Vec<O>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = O>,
    {
        match self {
            ExecutionStrategy::Sequential => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(task(item).await);
                }
                results
            }
            ExecutionStrategy::Concurrent { workers } => {
                stream::iter(items)
                    .map(task)
                    .buffer_unordered((*workers).max(1))
                    .collect()
                    .await
            }
        }
    }
}

/// Invoked once per run, after all phases, when the index changed.
/// Downstream keyword/retrieval state re-derives itself from the full
/// current chunk set.
#[async_trait]
pub trait RebuildHook: Send + Sync {
    async fn rebuild(&self) -> anyhow::Result<()>;
}

/// Default hook for callers with no downstream consumers wired up.
pub struct NoopRebuild;

#[async_trait]
impl RebuildHook for NoopRebuild {
    async fn rebuild(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Per-run behavior flags, resolved from config plus CLI overrides.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub auto_delete_missing_files: bool,
    pub enable_file_monitoring: bool,
    pub max_file_bytes: u64,
    pub max_consecutive_index_failures: u32,
    /// Reprocess every present file regardless of recorded hashes.
    pub full_resync: bool,
    /// Classify only; no index mutation, no rebuild signal.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_delete_missing_files: config.sync.auto_delete_missing_files,
            enable_file_monitoring: config.sync.enable_file_monitoring,
            max_file_bytes: config.chunking.max_file_bytes,
            max_consecutive_index_failures: config.sync.max_consecutive_index_failures,
            full_resync: false,
            dry_run: false,
        }
    }
}

/// Escalates repeated index failures into a fatal abort.
///
/// Only index operation failures count; a success resets the streak, and
/// file-level read failures leave it untouched.
struct FailureTracker {
    consecutive: u32,
    limit: u32,
}

impl FailureTracker {
    fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    fn succeeded(&mut self) {
        self.consecutive = 0;
    }

    fn failed(&mut self, error: &SyncError) -> SyncResult<()> {
        if !error.is_index_failure() {
            return Ok(());
        }
        self.consecutive += 1;
        if self.limit > 0 && self.consecutive >= self.limit {
            return Err(SyncError::IndexUnavailable(format!(
                "{} consecutive index operation failures",
                self.consecutive
            )));
        }
        Ok(())
    }
}

pub struct ReconciliationCoordinator {
    index: Arc<dyn DocumentIndex>,
    loader: Arc<dyn ContentLoader>,
    chunker: Arc<dyn Chunker>,
    rebuild_hook: Arc<dyn RebuildHook>,
    strategy: ExecutionStrategy,
    options: SyncOptions,
}

impl ReconciliationCoordinator {
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        loader: Arc<dyn ContentLoader>,
        chunker: Arc<dyn Chunker>,
        rebuild_hook: Arc<dyn RebuildHook>,
        strategy: ExecutionStrategy,
        options: SyncOptions,
    ) -> Self {
        Self {
            index,
            loader,
            chunker,
            rebuild_hook,
            strategy,
            options,
        }
    }

    /// Execute one full synchronization run over the given sources.
    ///
    /// Always returns a [`SyncReport`] on completion, even when individual
    /// files failed; returns `Err` only for infrastructure failures.
    pub async fn run(&self, sources: &[DataSourceDescriptor]) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(self.options.dry_run);

        // Scan every source; the first source to claim a path wins when
        // roots overlap.
        let mut files: BTreeMap<String, Arc<DataSourceDescriptor>> = BTreeMap::new();
        for source in sources {
            let descriptor = Arc::new(source.clone());
            let paths =
                scanner::scan(source).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
            for path in paths {
                files.entry(path).or_insert_with(|| Arc::clone(&descriptor));
            }
        }
        debug!(files = files.len(), sources = sources.len(), "scan complete");

        // One snapshot of the index, before any mutation. File-level fields
        // repeat across a file's chunks, so the first row per path is enough.
        let snapshot = self
            .index
            .get_metadata(&MetadataFilter::all())
            .await
            .map_err(|e| SyncError::IndexUnavailable(e.to_string()))?;
        let mut indexed: HashMap<String, IndexedChunkMetadata> = HashMap::new();
        for meta in snapshot {
            indexed.entry(meta.source_path.clone()).or_insert(meta);
        }

        let mut plan = self.build_plan(&files, &indexed, &mut report).await;
        plan.sort();
        report.set_counts(&plan);
        debug!(
            new = plan.new.len(),
            modified = plan.modified.len(),
            deleted = plan.deleted.len(),
            unchanged = plan.unchanged.len(),
            "classification complete"
        );

        if self.options.dry_run {
            return Ok(report);
        }
        if !plan.has_work() {
            debug!("nothing to reconcile");
            return Ok(report);
        }

        let mut tracker = FailureTracker::new(self.options.max_consecutive_index_failures);

        self.delete_phase(plan.deleted, &mut report, &mut tracker)
            .await?;
        let reinserts = self
            .update_phase(plan.modified, &mut report, &mut tracker)
            .await?;
        self.insert_phase(plan.new, reinserts, &mut report, &mut tracker)
            .await?;

        if report.changed() {
            match self.rebuild_hook.rebuild().await {
                Ok(()) => report.rebuild_triggered = true,
                Err(e) => warn!("downstream rebuild hook failed: {}", e),
            }
        }

        Ok(report)
    }

    /// Classify every observed file against the index snapshot.
    async fn build_plan(
        &self,
        files: &BTreeMap<String, Arc<DataSourceDescriptor>>,
        indexed: &HashMap<String, IndexedChunkMetadata>,
        report: &mut SyncReport,
    ) -> ReconciliationPlan {
        let mut plan = ReconciliationPlan::default();
        let mut to_hash: Vec<PendingFile> = Vec::new();

        for (path, source) in files {
            let pending = PendingFile {
                path: path.clone(),
                source: Arc::clone(source),
                fingerprint: None,
            };
            match indexed.get(path) {
                None => plan.new.push(pending),
                Some(_) if self.options.full_resync => plan.modified.push(pending),
                Some(_) if !self.options.enable_file_monitoring => {
                    plan.unchanged.push(path.clone())
                }
                Some(_) => to_hash.push(pending),
            }
        }

        // Hash previously-seen files to find real modifications.
        let max_bytes = self.options.max_file_bytes;
        let results = self
            .strategy
            .run_phase(to_hash, |file| async move {
                let result = detect::fingerprint(&file.path, max_bytes).await;
                (file, result)
            })
            .await;

        for (mut file, result) in results {
            match result {
                Ok(fingerprint) => match detect::classify(&fingerprint, indexed.get(&file.path)) {
                    FileClass::Modified => {
                        file.fingerprint = Some(fingerprint);
                        plan.modified.push(file);
                    }
                    _ => plan.unchanged.push(file.path),
                },
                Err(error) => report.record_failure(&file.path, SyncAction::Fingerprint, &error),
            }
        }

        // Indexed paths with no file on disk.
        if self.options.auto_delete_missing_files {
            plan.deleted = indexed
                .keys()
                .filter(|path| !files.contains_key(*path))
                .cloned()
                .collect();
        }

        plan
    }

    async fn delete_phase(
        &self,
        deleted: Vec<String>,
        report: &mut SyncReport,
        tracker: &mut FailureTracker,
    ) -> SyncResult<()> {
        if deleted.is_empty() {
            return Ok(());
        }

        let results = self
            .strategy
            .run_phase(deleted, |path| async move {
                let outcome = self.delete_for_source(&path).await;
                (path, outcome)
            })
            .await;

        for (path, outcome) in results {
            match outcome {
                Ok(removed) => {
                    report.chunks_deleted += removed;
                    report.record_success(&path, SyncAction::Delete);
                    tracker.succeeded();
                }
                Err(error) => {
                    report.record_failure(&path, SyncAction::Delete, &error);
                    tracker.failed(&error)?;
                }
            }
        }
        Ok(())
    }

    /// Remove the old chunks of every modified file. Files whose delete
    /// succeeded continue into the insert phase; a failed delete excludes
    /// the file, since inserting alongside stale chunks would duplicate it.
    async fn update_phase(
        &self,
        modified: Vec<PendingFile>,
        report: &mut SyncReport,
        tracker: &mut FailureTracker,
    ) -> SyncResult<Vec<PendingFile>> {
        if modified.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .strategy
            .run_phase(modified, |file| async move {
                let outcome = self.delete_for_source(&file.path).await;
                (file, outcome)
            })
            .await;

        let mut survivors = Vec::new();
        for (file, outcome) in results {
            match outcome {
                Ok(removed) => {
                    report.chunks_deleted += removed;
                    tracker.succeeded();
                    survivors.push(file);
                }
                Err(error) => {
                    report.record_failure(&file.path, SyncAction::Update, &error);
                    tracker.failed(&error)?;
                }
            }
        }
        survivors.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(survivors)
    }

    async fn insert_phase(
        &self,
        new: Vec<PendingFile>,
        reinserts: Vec<PendingFile>,
        report: &mut SyncReport,
        tracker: &mut FailureTracker,
    ) -> SyncResult<()> {
        let work: Vec<(PendingFile, SyncAction)> = new
            .into_iter()
            .map(|file| (file, SyncAction::Insert))
            .chain(reinserts.into_iter().map(|file| (file, SyncAction::Update)))
            .collect();
        if work.is_empty() {
            return Ok(());
        }

        let first_population = self
            .index
            .is_empty()
            .await
            .map_err(|e| SyncError::IndexUnavailable(e.to_string()))?;

        if first_population {
            self.batched_insert(work, report, tracker).await
        } else {
            self.incremental_insert(work, report, tracker).await
        }
    }

    /// First population of an empty index: derive all chunks (with per-file
    /// isolation), then submit one batched add.
    async fn batched_insert(
        &self,
        work: Vec<(PendingFile, SyncAction)>,
        report: &mut SyncReport,
        tracker: &mut FailureTracker,
    ) -> SyncResult<()> {
        let results = self
            .strategy
            .run_phase(work, |(file, action)| async move {
                let derived = self.derive_chunks(&file).await;
                (file, action, derived)
            })
            .await;

        let mut batch: Vec<TaggedChunk> = Vec::new();
        let mut batched: Vec<(String, SyncAction)> = Vec::new();
        for (file, action, derived) in results {
            match derived {
                Ok(chunks) => {
                    batched.push((file.path.clone(), action));
                    batch.extend(chunks);
                }
                Err(error) => {
                    report.record_failure(&file.path, action, &error);
                    tracker.failed(&error)?;
                }
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        match self.index.add(&batch).await {
            Ok(()) => {
                report.chunks_inserted += batch.len() as u64;
                for (path, action) in batched {
                    report.record_success(&path, action);
                    tracker.succeeded();
                }
            }
            Err(e) => {
                let reason = e.to_string();
                let mut last_error = None;
                for (path, action) in batched {
                    let error = SyncError::IndexOperation {
                        path: PathBuf::from(&path),
                        source: anyhow::anyhow!(reason.clone()),
                    };
                    report.record_failure(&path, action, &error);
                    last_error = Some(error);
                }
                if let Some(error) = last_error {
                    tracker.failed(&error)?;
                }
            }
        }
        Ok(())
    }

    async fn incremental_insert(
        &self,
        work: Vec<(PendingFile, SyncAction)>,
        report: &mut SyncReport,
        tracker: &mut FailureTracker,
    ) -> SyncResult<()> {
        let results = self
            .strategy
            .run_phase(work, |(file, action)| async move {
                let outcome = self.insert_file(&file).await;
                (file, action, outcome)
            })
            .await;

        for (file, action, outcome) in results {
            match outcome {
                Ok(count) => {
                    report.chunks_inserted += count as u64;
                    report.record_success(&file.path, action);
                    tracker.succeeded();
                }
                Err(error) => {
                    report.record_failure(&file.path, action, &error);
                    tracker.failed(&error)?;
                }
            }
        }
        Ok(())
    }

    /// Load, chunk, and tag one file. Reuses the classification fingerprint
    /// when one exists so no file is hashed twice in a run.
    async fn derive_chunks(&self, file: &PendingFile) -> SyncResult<Vec<TaggedChunk>> {
        let fingerprint = match &file.fingerprint {
            Some(fingerprint) => fingerprint.clone(),
            None => detect::fingerprint(&file.path, self.options.max_file_bytes).await?,
        };

        let text = self
            .loader
            .load(Path::new(&file.path))
            .await
            .map_err(|e| SyncError::FileUnreadable {
                path: PathBuf::from(&file.path),
                reason: e.to_string(),
            })?;

        let pieces = self.chunker.split(&text);
        Ok(tagger::tag_chunks(&file.source, &fingerprint, pieces))
    }

    async fn insert_file(&self, file: &PendingFile) -> SyncResult<usize> {
        let chunks = self.derive_chunks(file).await?;
        self.index
            .add(&chunks)
            .await
            .map_err(|e| SyncError::IndexOperation {
                path: PathBuf::from(&file.path),
                source: e,
            })?;
        Ok(chunks.len())
    }

    /// Remove every chunk whose `source_path` matches. Zero matching rows is
    /// not an error: the path is already absent.
    async fn delete_for_source(&self, path: &str) -> SyncResult<u64> {
        let rows = self
            .index
            .get_metadata(&MetadataFilter::source_path(path))
            .await
            .map_err(|e| SyncError::IndexOperation {
                path: PathBuf::from(path),
                source: e,
            })?;
        if rows.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = rows.into_iter().map(|meta| meta.chunk_id).collect();
        self.index
            .delete(&ids)
            .await
            .map_err(|e| SyncError::IndexOperation {
                path: PathBuf::from(path),
                source: e,
            })
    }
}
