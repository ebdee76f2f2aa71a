//! SQLite-backed [`DocumentIndex`] implementation.
//!
//! One `chunks` table holds the full wire contract (see
//! [`IndexedChunkMetadata`]); `idx_chunks_source_path` makes the
//! `source_path == X` predicate cheap, which the reconciliation engine
//! leans on for every delete and update.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::{IndexedChunkMetadata, TaggedChunk};

use super::{DocumentIndex, MetadataFilter};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_metadata(row: &sqlx::sqlite::SqliteRow) -> IndexedChunkMetadata {
    IndexedChunkMetadata {
        chunk_id: row.get("chunk_id"),
        source_path: row.get("source_path"),
        content_hash: row.get("content_hash"),
        mtime: row.get("mtime"),
        byte_size: row.get("byte_size"),
        category: row.get("category"),
        data_source_name: row.get("data_source_name"),
        priority: row.get("priority"),
    }
}

const METADATA_COLUMNS: &str = "chunk_id, source_path, content_hash, mtime, byte_size, \
                                category, data_source_name, priority";

#[async_trait]
impl DocumentIndex for SqliteIndex {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<IndexedChunkMetadata>> {
        let rows = match &filter.source_path {
            Some(path) => {
                sqlx::query(&format!(
                    "SELECT {} FROM chunks WHERE source_path = ? ORDER BY chunk_index",
                    METADATA_COLUMNS
                ))
                .bind(path)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM chunks ORDER BY source_path, chunk_index",
                    METADATA_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(row_to_metadata).collect())
    }

    async fn add(&self, chunks: &[TaggedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO chunks
                    (chunk_id, source_path, content_hash, mtime, byte_size,
                     category, data_source_name, priority, chunk_index, text)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.meta.chunk_id)
            .bind(&chunk.meta.source_path)
            .bind(&chunk.meta.content_hash)
            .bind(chunk.meta.mtime)
            .bind(chunk.meta.byte_size)
            .bind(&chunk.meta.category)
            .bind(&chunk.meta.data_source_name)
            .bind(chunk.meta.priority)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, chunk_ids: &[String]) -> Result<u64> {
        if chunk_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;
        for chunk_id in chunk_ids {
            let result = sqlx::query("DELETE FROM chunks WHERE chunk_id = ?")
                .bind(chunk_id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }
        tx.commit().await?;

        Ok(removed)
    }

    async fn is_empty(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }
}
