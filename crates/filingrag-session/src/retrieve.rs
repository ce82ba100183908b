//! Two-stage retrieve-then-rerank candidate selection.

use anyhow::{ensure, Result};

use filingrag_core::traits::Reranker;
use filingrag_core::types::{Chunk, ScoredChunk};
use filingrag_index::FlatIndex;

/// Stage-1 candidate count. Deliberately generous; reranking narrows it.
pub const DEFAULT_TOP_K: usize = 10;

/// Two-stage retrieval: a high-recall vector pass, then an optional
/// higher-precision rerank over the full candidate set.
pub struct Retriever {
    reranker: Box<dyn Reranker>,
}

impl Retriever {
    pub fn new(reranker: Box<dyn Reranker>) -> Self {
        Self { reranker }
    }

    /// Returns up to `top_k` candidates, descending by score. With `rerank`
    /// the reranker's scores replace the vector scores and the set is
    /// stable-sorted, so ties keep their stage-1 order and output is
    /// deterministic for deterministic inputs.
    pub fn retrieve(
        &self,
        index: &FlatIndex,
        query: &str,
        top_k: usize,
        rerank: bool,
    ) -> Result<Vec<ScoredChunk>> {
        let mut candidates = index.search(query, top_k)?;
        if !rerank || candidates.is_empty() {
            return Ok(candidates);
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        let scores = self.reranker.score(query, &texts)?;
        ensure!(
            scores.len() == candidates.len(),
            "reranker returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        );
        for (candidate, score) in candidates.iter_mut().zip(scores) {
            candidate.score = score;
        }
        candidates
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(candidates)
    }
}

/// Renders one `"{document}, p. {page}"` citation per chunk (bare document
/// name when the page is unknown), deduplicated by exact string with
/// first-appearance order preserved.
pub fn format_sources(chunks: &[Chunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        let source = match chunk.page {
            Some(page) => format!("{}, p. {}", chunk.document, page),
            None => chunk.document.clone(),
        };
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}
