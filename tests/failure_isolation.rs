//! Failure isolation and escalation behavior, driven against the in-memory
//! index with injected faults.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use corpus_sync::chunker::CharChunker;
use corpus_sync::error::SyncError;
use corpus_sync::loader::{ContentLoader, TextFileLoader};
use corpus_sync::models::{DataSourceDescriptor, IndexedChunkMetadata, TaggedChunk};
use corpus_sync::reconcile::{
    ExecutionStrategy, NoopRebuild, ReconciliationCoordinator, SyncOptions,
};
use corpus_sync::store::memory::MemoryIndex;
use corpus_sync::store::{DocumentIndex, MetadataFilter};

fn source(root: &Path) -> DataSourceDescriptor {
    DataSourceDescriptor {
        name: "default".to_string(),
        path: root.to_path_buf(),
        category: "default".to_string(),
        priority: 999,
        file_patterns: vec!["*.txt".to_string()],
        enabled: true,
    }
}

fn options() -> SyncOptions {
    SyncOptions {
        auto_delete_missing_files: true,
        enable_file_monitoring: true,
        max_file_bytes: 10 * 1024 * 1024,
        max_consecutive_index_failures: 3,
        full_resync: false,
        dry_run: false,
    }
}

/// Loader that fails for file names containing a marker substring.
struct FaultyLoader {
    marker: String,
    inner: TextFileLoader,
}

impl FaultyLoader {
    fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            inner: TextFileLoader::new(u64::MAX),
        }
    }
}

#[async_trait]
impl ContentLoader for FaultyLoader {
    async fn load(&self, path: &Path) -> Result<String> {
        if path.to_string_lossy().contains(&self.marker) {
            anyhow::bail!("injected read failure");
        }
        self.inner.load(path).await
    }
}

/// Index wrapper whose mutating operations always fail, simulating an
/// unreachable store behind a healthy metadata cache.
struct BrokenWrites {
    inner: MemoryIndex,
}

#[async_trait]
impl DocumentIndex for BrokenWrites {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<IndexedChunkMetadata>> {
        self.inner.get_metadata(filter).await
    }

    async fn add(&self, _chunks: &[TaggedChunk]) -> Result<()> {
        anyhow::bail!("store unreachable")
    }

    async fn delete(&self, _chunk_ids: &[String]) -> Result<u64> {
        anyhow::bail!("store unreachable")
    }

    async fn is_empty(&self) -> Result<bool> {
        self.inner.is_empty().await
    }
}

fn coordinator(
    index: Arc<dyn DocumentIndex>,
    loader: Arc<dyn ContentLoader>,
    strategy: ExecutionStrategy,
    options: SyncOptions,
) -> ReconciliationCoordinator {
    ReconciliationCoordinator::new(
        index,
        loader,
        Arc::new(CharChunker::new(500, 0)),
        Arc::new(NoopRebuild),
        strategy,
        options,
    )
}

#[tokio::test]
async fn test_one_unreadable_file_does_not_block_the_rest() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("one.txt"), "first file").unwrap();
    fs::write(tmp.path().join("two-faulty.txt"), "second file").unwrap();
    fs::write(tmp.path().join("three.txt"), "third file").unwrap();

    let index = Arc::new(MemoryIndex::new());
    let engine = coordinator(
        index.clone(),
        Arc::new(FaultyLoader::new("faulty")),
        ExecutionStrategy::Concurrent { workers: 4 },
        options(),
    );

    let report = engine.run(&[source(tmp.path())]).await.unwrap();

    // all three were attempted; exactly one failed
    assert_eq!(report.new, 3);
    assert_eq!(report.files_indexed, 2);
    assert_eq!(report.files_failed, 1);
    let failed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.error.is_some())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.contains("faulty"));

    // the two healthy files made it into the index
    let stored = index.get_metadata(&MetadataFilter::all()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|m| !m.source_path.contains("faulty")));

    // the run still counts as a change and reported success overall
    assert!(report.rebuild_triggered);
}

#[tokio::test]
async fn test_unreadable_file_recovers_on_next_run() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("one.txt"), "first file").unwrap();
    fs::write(tmp.path().join("two-faulty.txt"), "second file").unwrap();

    let index = Arc::new(MemoryIndex::new());
    let faulty = coordinator(
        index.clone(),
        Arc::new(FaultyLoader::new("faulty")),
        ExecutionStrategy::Sequential,
        options(),
    );
    faulty.run(&[source(tmp.path())]).await.unwrap();

    // next run with a healthy loader: the failed file is still "new"
    // because nothing of it ever reached the index
    let healthy = coordinator(
        index.clone(),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        options(),
    );
    let report = healthy.run(&[source(tmp.path())]).await.unwrap();
    assert_eq!(report.new, 1);
    assert_eq!(report.unchanged, 1);

    let stored = index.get_metadata(&MetadataFilter::all()).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_consecutive_index_failures_abort_the_run() {
    let tmp = TempDir::new().unwrap();
    for i in 0..5 {
        fs::write(tmp.path().join(format!("f{}.txt", i)), format!("file {}", i)).unwrap();
    }

    // Seed the inner index so the run takes the incremental insert path.
    let inner = MemoryIndex::new();
    inner
        .add(&[TaggedChunk {
            meta: IndexedChunkMetadata {
                chunk_id: "seed".to_string(),
                source_path: "/elsewhere/seed.txt".to_string(),
                content_hash: "h".to_string(),
                mtime: 0,
                byte_size: 1,
                category: "default".to_string(),
                data_source_name: "default".to_string(),
                priority: 999,
            },
            chunk_index: 0,
            text: "seed".to_string(),
        }])
        .await
        .unwrap();

    let mut opts = options();
    opts.auto_delete_missing_files = false;
    let engine = coordinator(
        Arc::new(BrokenWrites { inner }),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        opts,
    );

    let err = engine.run(&[source(tmp.path())]).await.unwrap_err();
    assert!(matches!(err, SyncError::IndexUnavailable(_)), "{err}");
}

#[tokio::test]
async fn test_fingerprint_failure_is_recorded_not_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("big.txt"), "0123456789").unwrap();
    fs::write(tmp.path().join("ok.txt"), "fine").unwrap();

    let index = Arc::new(MemoryIndex::new());
    // First index both files with a generous limit.
    let engine = coordinator(
        index.clone(),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        options(),
    );
    engine.run(&[source(tmp.path())]).await.unwrap();

    // Now shrink the limit so big.txt cannot be hashed during
    // classification. The run completes; big.txt is a recorded failure.
    let mut opts = options();
    opts.max_file_bytes = 5;
    let limited = coordinator(
        index.clone(),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        opts,
    );
    let report = limited.run(&[source(tmp.path())]).await.unwrap();
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.unchanged, 1);
    // the oversized file keeps its previously indexed chunks
    let stored = index.get_metadata(&MetadataFilter::all()).await.unwrap();
    assert!(stored.iter().any(|m| m.source_path.contains("big")));
}

#[tokio::test]
async fn test_failed_update_delete_keeps_file_out_of_insert_phase() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "version one").unwrap();

    let index = Arc::new(MemoryIndex::new());
    let engine = coordinator(
        index.clone(),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        options(),
    );
    engine.run(&[source(tmp.path())]).await.unwrap();
    let before = index.snapshot();

    // Edit the file, then run against an index whose writes fail: the
    // update's delete fails, so no half-updated state may appear.
    fs::write(tmp.path().join("a.txt"), "version two").unwrap();
    let inner = MemoryIndex::new();
    for chunk in &before {
        inner.add(std::slice::from_ref(chunk)).await.unwrap();
    }
    let mut opts = options();
    opts.max_consecutive_index_failures = 10;
    let broken = coordinator(
        Arc::new(BrokenWrites { inner }),
        Arc::new(TextFileLoader::new(u64::MAX)),
        ExecutionStrategy::Sequential,
        opts,
    );
    let report = broken.run(&[source(tmp.path())]).await.unwrap();
    assert_eq!(report.modified, 1);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_indexed, 0);
    assert_eq!(report.chunks_inserted, 0);
}
