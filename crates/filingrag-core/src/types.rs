//! Domain types used across the retrieval pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A page-attributed excerpt of a filing that is independently indexed.
///
/// - `id`: unique within a document (`"{document}_{n}"`, `n` counted over
///   kept chunks in creation order)
/// - `document`: display name used in citations
/// - `page`: 1-based page the chunk starts on, when known
/// - `position`: character offset of the chunk start within the document's
///   concatenated page text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub document: String,
    #[serde(default)]
    pub page: Option<u32>,
    pub position: usize,
}

/// A chunk paired with its retrieval score. Cosine similarity after the
/// vector stage, reranker score after reranking. Higher is always better.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A corpus entry: where the file lives and how citations name it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub path: String,
    pub name: String,
}

/// The user-visible outcome of a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}
