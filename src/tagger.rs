//! Chunk tagging: deterministic ids and metadata attachment.
//!
//! `chunk_id` is a SHA-256 over the source path and the chunk's text, so
//! re-deriving the same chunk from the same file content always yields the
//! same id. That makes re-indexing idempotent: replaying an insert writes
//! the same rows, and duplicate chunk text within one file collapses to a
//! single row.

use sha2::{Digest, Sha256};

use crate::models::{DataSourceDescriptor, FileFingerprint, IndexedChunkMetadata, TaggedChunk};

/// Deterministic chunk id for `(source_path, chunk_content)`.
pub fn chunk_id(source_path: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Attach metadata to every chunk derived from one file.
///
/// Pure function: the same descriptor, fingerprint, and chunk texts always
/// produce the same tagged chunks. File-level fields (`content_hash`,
/// `mtime`, `byte_size`) repeat on every chunk; they describe the file.
pub fn tag_chunks(
    source: &DataSourceDescriptor,
    fingerprint: &FileFingerprint,
    pieces: Vec<String>,
) -> Vec<TaggedChunk> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| TaggedChunk {
            meta: IndexedChunkMetadata {
                chunk_id: chunk_id(&fingerprint.path, &text),
                source_path: fingerprint.path.clone(),
                content_hash: fingerprint.content_hash.clone(),
                mtime: fingerprint.mtime,
                byte_size: fingerprint.byte_size,
                category: source.category.clone(),
                data_source_name: source.name.clone(),
                priority: source.priority,
            },
            chunk_index: index as i64,
            text,
        })
        .collect()
}
