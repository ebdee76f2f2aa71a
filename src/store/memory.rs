//! In-memory [`DocumentIndex`] implementation for tests.
//!
//! A `Vec` of tagged chunks behind `std::sync::RwLock`. Adds replace by
//! `chunk_id` so replays stay idempotent, matching the SQLite store.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedChunkMetadata, TaggedChunk};

use super::{DocumentIndex, MetadataFilter};

#[derive(Default)]
pub struct MemoryIndex {
    chunks: RwLock<Vec<TaggedChunk>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored chunks, for test assertions.
    pub fn snapshot(&self) -> Vec<TaggedChunk> {
        self.chunks.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<IndexedChunkMetadata>> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks
            .iter()
            .filter(|chunk| match &filter.source_path {
                Some(path) => &chunk.meta.source_path == path,
                None => true,
            })
            .map(|chunk| chunk.meta.clone())
            .collect())
    }

    async fn add(&self, new_chunks: &[TaggedChunk]) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap();
        for chunk in new_chunks {
            chunks.retain(|existing| existing.meta.chunk_id != chunk.meta.chunk_id);
            chunks.push(chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, chunk_ids: &[String]) -> Result<u64> {
        let mut chunks = self.chunks.write().unwrap();
        let before = chunks.len();
        chunks.retain(|chunk| !chunk_ids.contains(&chunk.meta.chunk_id));
        Ok((before - chunks.len()) as u64)
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.chunks.read().unwrap().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source_path: &str) -> TaggedChunk {
        TaggedChunk {
            meta: IndexedChunkMetadata {
                chunk_id: id.to_string(),
                source_path: source_path.to_string(),
                content_hash: "h".to_string(),
                mtime: 0,
                byte_size: 1,
                category: "general".to_string(),
                data_source_name: "default".to_string(),
                priority: 999,
            },
            chunk_index: 0,
            text: "text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent_by_chunk_id() {
        let index = MemoryIndex::new();
        index.add(&[chunk("c1", "/a")]).await.unwrap();
        index.add(&[chunk("c1", "/a")]).await.unwrap();
        assert_eq!(index.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_by_source_path() {
        let index = MemoryIndex::new();
        index
            .add(&[chunk("c1", "/a"), chunk("c2", "/b")])
            .await
            .unwrap();

        let rows = index
            .get_metadata(&MetadataFilter::source_path("/a"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chunk_id, "c1");

        let all = index.get_metadata(&MetadataFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_count() {
        let index = MemoryIndex::new();
        index
            .add(&[chunk("c1", "/a"), chunk("c2", "/a")])
            .await
            .unwrap();

        let removed = index
            .delete(&["c1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!index.is_empty().await.unwrap());
    }
}
