//! Fixed-window chunking with page attribution.

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Windows whose stripped text is shorter than this are dropped; such
/// fragments are almost always trailing boilerplate.
const MIN_CHUNK_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 50 }
    }
}

/// Half-open character-offset range one page occupies in the concatenated
/// document text.
#[derive(Debug, Clone, Copy)]
struct PageSpan {
    start: usize,
    end: usize,
    page: u32,
}

/// Splits per-page document text into overlapping fixed-size passages.
///
/// All offsets are character offsets into the concatenated page text. The
/// overlap between adjacent windows intentionally duplicates text so that
/// answers straddling a window boundary stay retrievable.
#[derive(Debug, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Concatenates `pages` in order (blank line after each page) and slides
    /// a `chunk_size` window with step `chunk_size - overlap` across the
    /// result. Kept chunks are numbered `"{document}_{n}"` over kept windows,
    /// not window positions.
    pub fn chunk_pages(&self, document: &str, pages: &[String]) -> Vec<Chunk> {
        let mut full_text: Vec<char> = Vec::new();
        // Spans are pushed in page order, so the list is sorted by start
        // offset and "first containing span" is well-defined.
        let mut spans: Vec<PageSpan> = Vec::with_capacity(pages.len());
        for (page_idx, page_text) in pages.iter().enumerate() {
            let start = full_text.len();
            full_text.extend(page_text.chars());
            full_text.extend("\n\n".chars());
            spans.push(PageSpan { start, end: full_text.len(), page: page_idx as u32 + 1 });
        }

        let step = self.config.chunk_size - self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < full_text.len() {
            let end = (start + self.config.chunk_size).min(full_text.len());
            let text: String = full_text[start..end].iter().collect();
            if text.trim().chars().count() >= MIN_CHUNK_CHARS {
                chunks.push(Chunk {
                    id: format!("{}_{}", document, chunks.len()),
                    text,
                    document: document.to_string(),
                    page: Some(page_for_offset(&spans, start)),
                    position: start,
                });
            }
            start += step;
        }
        chunks
    }
}

/// First span (lowest start offset) containing `offset`; page 1 when no
/// span matches.
fn page_for_offset(spans: &[PageSpan], offset: usize) -> u32 {
    spans
        .iter()
        .find(|s| s.start <= offset && offset < s.end)
        .map_or(1, |s| s.page)
}
