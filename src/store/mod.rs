//! Document index abstraction.
//!
//! The [`DocumentIndex`] trait is the engine's only view of the persisted
//! chunk store. The reconciliation coordinator is a leaf consumer: it reads
//! metadata, adds tagged chunks, and deletes by chunk id, and expects the
//! index to keep concurrent operations on disjoint source paths safe.
//!
//! Implementations must be `Send + Sync` to work with the concurrent
//! execution strategy.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedChunkMetadata, TaggedChunk};

/// Predicate for metadata reads. The engine only ever filters by source
/// path; `all()` is used for the one snapshot read at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub source_path: Option<String>,
}

impl MetadataFilter {
    pub fn all() -> Self {
        Self { source_path: None }
    }

    pub fn source_path(path: impl Into<String>) -> Self {
        Self {
            source_path: Some(path.into()),
        }
    }
}

/// Abstract chunked document store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_metadata`](DocumentIndex::get_metadata) | Read chunk metadata matching a predicate |
/// | [`add`](DocumentIndex::add) | Insert (or idempotently re-insert) tagged chunks |
/// | [`delete`](DocumentIndex::delete) | Remove chunks by id, returning the count removed |
/// | [`is_empty`](DocumentIndex::is_empty) | Whether the index holds no chunks at all |
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<IndexedChunkMetadata>>;

    /// Adds must be idempotent with respect to `chunk_id`: re-adding a chunk
    /// that already exists replaces it rather than duplicating it.
    async fn add(&self, chunks: &[TaggedChunk]) -> Result<()>;

    async fn delete(&self, chunk_ids: &[String]) -> Result<u64>;

    async fn is_empty(&self) -> Result<bool>;
}
