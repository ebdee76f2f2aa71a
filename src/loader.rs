use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Loads a source file's content as text.
///
/// Failures surface as per-file errors in the sync report; the trait exists
/// so tests and non-filesystem backends can substitute their own loader.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<String>;
}

/// UTF-8 text file loader with a size cap.
///
/// Files over the cap are rejected outright rather than truncated; a
/// truncated document indexed silently is worse than a reported failure.
pub struct TextFileLoader {
    max_bytes: u64,
}

impl TextFileLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

#[async_trait]
impl ContentLoader for TextFileLoader {
    async fn load(&self, path: &Path) -> Result<String> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("stat failed: {}", path.display()))?;
        if metadata.len() > self.max_bytes {
            bail!(
                "{} is {} bytes, over the {} byte limit",
                path.display(),
                metadata.len(),
                self.max_bytes
            );
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read failed: {}", path.display()))?;
        String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))
    }
}
