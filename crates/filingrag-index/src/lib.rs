//! Exact inner-product vector index over chunk embeddings.
//!
//! Embeddings are unit-normalized by the `Embedder`, so inner product equals
//! cosine similarity. The index is append-only: grown by batched adds during
//! ingestion, searched read-only afterwards. Persistence writes two
//! artifacts per directory: `index.bin` (bincode, dimensionality + row-major
//! vector matrix) and `chunks.json` (ordered chunk records).

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use filingrag_core::error::Error;
use filingrag_core::traits::Embedder;
use filingrag_core::types::{Chunk, ScoredChunk};

const INDEX_FILE: &str = "index.bin";
const CHUNKS_FILE: &str = "chunks.json";

/// Texts per embed call during `add`. Keeps embedding memory bounded on
/// large filings.
const EMBED_BATCH: usize = 32;

/// On-disk form of the search structure: everything needed to rebuild it,
/// including dimensionality.
#[derive(Serialize, Deserialize)]
struct StoredMatrix {
    dim: usize,
    vectors: Vec<f32>,
}

/// Flat (brute-force) vector index. Chunks and vector rows are kept in
/// lock-step: row `i` is the embedding of `chunks[i]`.
pub struct FlatIndex {
    embedder: Box<dyn Embedder>,
    dim: Option<usize>,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatIndex")
            .field("dim", &self.dim)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl FlatIndex {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder, dim: None, vectors: Vec::new(), chunks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Embeds and appends `chunks`. No-op on empty input. The first batch
    /// fixes the index dimensionality; later batches must match it.
    pub fn add(&mut self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks embedded")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            embeddings.extend(self.embedder.embed_batch(batch)?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        let batch_dim = embeddings[0].len();
        for e in &embeddings {
            if e.len() != batch_dim {
                return Err(Error::DimensionMismatch { expected: batch_dim, actual: e.len() }.into());
            }
        }
        match self.dim {
            None => self.dim = Some(batch_dim),
            Some(dim) if dim != batch_dim => {
                return Err(Error::DimensionMismatch { expected: dim, actual: batch_dim }.into());
            }
            Some(_) => {}
        }

        for e in embeddings {
            self.vectors.extend(e);
        }
        self.chunks.extend_from_slice(chunks);
        tracing::debug!(total = self.chunks.len(), "index grown");
        Ok(())
    }

    /// Exact top-k search by inner product (cosine similarity for unit
    /// vectors). `k` is silently capped at the index size. Fails if the
    /// index has never been added to.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let dim = self.dim.ok_or(Error::IndexNotInitialized)?;
        let q = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
        if q.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: q.len() }.into());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(dim)
            .enumerate()
            .map(|(i, row)| (i, dot(&q, row)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.chunks.len()));

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.chunks[i].clone(), score })
            .collect())
    }

    /// Writes both artifacts under `dir`. Fails on an empty index.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let dim = match self.dim {
            Some(dim) if !self.chunks.is_empty() => dim,
            _ => return Err(Error::EmptyIndex.into()),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create index directory {}", dir.display()))?;

        let blob = bincode::serialize(&StoredMatrix { dim, vectors: self.vectors.clone() })
            .map_err(|e| Error::Persistence(format!("failed to encode vector matrix: {e}")))?;
        fs::write(dir.join(INDEX_FILE), blob)
            .with_context(|| format!("failed to write {}", dir.join(INDEX_FILE).display()))?;

        let records = serde_json::to_vec(&self.chunks)
            .map_err(|e| Error::Persistence(format!("failed to encode chunk records: {e}")))?;
        fs::write(dir.join(CHUNKS_FILE), records)
            .with_context(|| format!("failed to write {}", dir.join(CHUNKS_FILE).display()))?;

        tracing::info!(chunks = self.chunks.len(), dir = %dir.display(), "index saved");
        Ok(())
    }

    /// Restores both artifacts from `dir`, re-deriving dimensionality from
    /// the vector matrix. A missing or malformed artifact fails loudly; the
    /// index is left untouched in that case.
    pub fn load(&mut self, dir: &Path) -> Result<()> {
        let blob = fs::read(dir.join(INDEX_FILE))
            .with_context(|| format!("failed to read {}", dir.join(INDEX_FILE).display()))?;
        let stored: StoredMatrix = bincode::deserialize(&blob)
            .map_err(|e| Error::Persistence(format!("malformed vector matrix: {e}")))?;

        let records = fs::read(dir.join(CHUNKS_FILE))
            .with_context(|| format!("failed to read {}", dir.join(CHUNKS_FILE).display()))?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&records)
            .map_err(|e| Error::Persistence(format!("malformed chunk records: {e}")))?;

        if stored.dim == 0 || stored.vectors.len() != stored.dim * chunks.len() {
            return Err(Error::Persistence(format!(
                "vector matrix ({} floats, dim {}) does not match {} chunk records",
                stored.vectors.len(),
                stored.dim,
                chunks.len()
            ))
            .into());
        }

        self.dim = Some(stored.dim);
        self.vectors = stored.vectors;
        self.chunks = chunks;
        tracing::info!(chunks = self.chunks.len(), dir = %dir.display(), "index loaded");
        Ok(())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
