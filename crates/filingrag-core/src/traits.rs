use std::path::Path;

/// Batch text embedding. Vectors are unit-normalized and share a fixed
/// dimensionality across calls.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Relevance scoring of a candidate set against a query. Output order
/// matches input order; scores may be unbounded.
pub trait Reranker: Send + Sync {
    fn score(&self, query: &str, candidates: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Text generation from a fully rendered prompt. May fail; callers decide
/// how failures degrade.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: usize) -> anyhow::Result<String>;
}

/// Per-page text extraction from a corpus file.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>>;
}

/// Pre-retrieval query filter. `true` means the query is outside the
/// corpus domain and must be refused without retrieval.
pub trait ScopeGate: Send + Sync {
    fn is_out_of_scope(&self, query: &str) -> bool;
}
