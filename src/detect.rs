//! Change detection: per-file fingerprinting and NEW/MODIFIED/UNCHANGED
//! classification.
//!
//! The content hash is authoritative. mtime and size are recorded as advisory
//! metadata but never trusted for classification: a file touched without a
//! content change stays UNCHANGED, and a content change with a preserved
//! mtime is still MODIFIED. Relying on mtime alone misfires after
//! copy/restore operations, and a stale index entry silently served to users
//! is worse than the cost of hashing.

use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::SystemTime;

use crate::error::{SyncError, SyncResult};
use crate::models::{FileClass, FileFingerprint, IndexedChunkMetadata};

/// Compute a fresh fingerprint for one file.
///
/// Fails with [`SyncError::FileUnreadable`] if the file cannot be read or
/// exceeds `max_bytes`; the caller records the failure and moves on.
pub async fn fingerprint(path: &str, max_bytes: u64) -> SyncResult<FileFingerprint> {
    let unreadable = |reason: String| SyncError::FileUnreadable {
        path: Path::new(path).to_path_buf(),
        reason,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;

    if metadata.len() > max_bytes {
        return Err(unreadable(format!(
            "file is {} bytes, over the {} byte limit",
            metadata.len(),
            max_bytes
        )));
    }

    let mtime = metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    Ok(FileFingerprint {
        path: path.to_string(),
        content_hash,
        mtime,
        byte_size: bytes.len() as i64,
    })
}

/// Classify a present file against what the index already recorded for it.
pub fn classify(fresh: &FileFingerprint, existing: Option<&IndexedChunkMetadata>) -> FileClass {
    match existing {
        None => FileClass::New,
        Some(meta) if meta.content_hash != fresh.content_hash => FileClass::Modified,
        Some(_) => FileClass::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn meta_with_hash(hash: &str) -> IndexedChunkMetadata {
        IndexedChunkMetadata {
            chunk_id: "c1".to_string(),
            source_path: "/tmp/a.txt".to_string(),
            content_hash: hash.to_string(),
            mtime: 0,
            byte_size: 0,
            category: "general".to_string(),
            data_source_name: "default".to_string(),
            priority: 999,
        }
    }

    #[tokio::test]
    async fn test_fingerprint_is_stable_across_mtime_changes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        let path = path.to_string_lossy().to_string();

        let first = fingerprint(&path, u64::MAX).await.unwrap();
        // rewrite identical content; mtime may move, the hash must not
        fs::write(&path, "hello").unwrap();
        let second = fingerprint(&path, u64::MAX).await.unwrap();

        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.byte_size, 5);
    }

    #[tokio::test]
    async fn test_fingerprint_missing_file() {
        let err = fingerprint("/nonexistent/corpus-sync/a.txt", u64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::FileUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_fingerprint_oversized_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        fs::write(&path, "0123456789").unwrap();

        let err = fingerprint(&path.to_string_lossy(), 4).await.unwrap_err();
        assert!(matches!(err, SyncError::FileUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_classify_hash_precedence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "content").unwrap();
        let fresh = fingerprint(&path.to_string_lossy(), u64::MAX).await.unwrap();

        // no record: new
        assert_eq!(classify(&fresh, None), FileClass::New);
        // same hash, different mtime in the index: unchanged
        let mut same = meta_with_hash(&fresh.content_hash);
        same.mtime = fresh.mtime + 3600;
        assert_eq!(classify(&fresh, Some(&same)), FileClass::Unchanged);
        // different hash, identical mtime: modified
        let mut other = meta_with_hash("deadbeef");
        other.mtime = fresh.mtime;
        assert_eq!(classify(&fresh, Some(&other)), FileClass::Modified);
    }
}
