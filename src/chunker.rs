//! Fixed-size text chunker with paragraph-boundary splitting and overlap.
//!
//! Splitting is deterministic: identical input text always produces the
//! identical chunk sequence, which is what makes chunk ids reproducible
//! across runs. Splitting occurs on paragraph boundaries (`\n\n`) where
//! possible; paragraphs larger than the chunk size are hard-split at
//! newline/space boundaries.
//!
//! When `overlap` is non-zero, each chunk after the first is prefixed with
//! the trailing characters of its predecessor, so chunks can run slightly
//! past `chunk_size` by the length of the carried tail.

/// Splits raw text into chunk-sized pieces.
///
/// The engine only depends on this seam; swap in a different splitter to
/// change chunking policy without touching reconciliation.
pub trait Chunker: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Character-window chunker. Sizes are in characters, not bytes, so
/// multi-byte text never splits inside a code point.
#[derive(Debug, Clone)]
pub struct CharChunker {
    chunk_size: usize,
    overlap: usize,
}

impl CharChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Paragraph-accumulating segmentation without overlap.
    fn base_segments(&self, text: &str) -> Vec<String> {
        let max = self.chunk_size;
        let mut segments = Vec::new();
        let mut buf = String::new();

        for para in text.split("\n\n") {
            let trimmed = para.trim();
            if trimmed.is_empty() {
                continue;
            }
            let para_chars = trimmed.chars().count();

            // If adding this paragraph would exceed the max, flush first.
            let would_be = if buf.is_empty() {
                para_chars
            } else {
                buf.chars().count() + 2 + para_chars
            };
            if would_be > max && !buf.is_empty() {
                segments.push(std::mem::take(&mut buf));
            }

            if para_chars > max {
                if !buf.is_empty() {
                    segments.push(std::mem::take(&mut buf));
                }
                hard_split(trimmed, max, &mut segments);
            } else {
                if !buf.is_empty() {
                    buf.push_str("\n\n");
                }
                buf.push_str(trimmed);
            }
        }

        if !buf.is_empty() {
            segments.push(buf);
        }

        // A file must always yield at least one chunk, or the index would
        // have no record of it and every later run would classify it as new.
        if segments.is_empty() {
            segments.push(text.trim().to_string());
        }

        segments
    }
}

impl Chunker for CharChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let base = self.base_segments(text);
        if self.overlap == 0 || base.len() <= 1 {
            return base;
        }

        let mut chunks = Vec::with_capacity(base.len());
        chunks.push(base[0].clone());
        for pair in base.windows(2) {
            let tail = overlap_tail(&pair[0], self.overlap);
            if tail.is_empty() {
                chunks.push(pair[1].clone());
            } else {
                chunks.push(format!("{}\n{}", tail, pair[1]));
            }
        }
        chunks
    }
}

/// Split an oversized paragraph at `max` characters, preferring newline or
/// space boundaries. Always makes progress on non-empty input.
fn hard_split(text: &str, max: usize, out: &mut Vec<String>) {
    let mut remaining = text;
    while !remaining.is_empty() {
        let limit = match remaining.char_indices().nth(max) {
            None => {
                out.push(remaining.to_string());
                break;
            }
            Some((byte_idx, _)) => byte_idx,
        };

        let window = &remaining[..limit];
        let mut split_at = window
            .rfind(['\n', ' '])
            .map(|pos| pos + 1)
            .unwrap_or(limit);
        if split_at == 0 {
            split_at = limit;
        }

        let piece = remaining[..split_at].trim_end();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = remaining[split_at..].trim_start();
    }
}

/// The last `overlap` characters of a chunk, advanced to a word boundary
/// when one exists.
fn overlap_tail(text: &str, overlap: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - overlap..].iter().collect();
    match tail.find(char::is_whitespace) {
        Some(pos) => tail[pos..].trim_start().to_string(),
        None => tail,
    }
}
