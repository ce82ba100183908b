//! Session facade over the retrieval pipeline.
//!
//! A `Session` owns the ingest-then-serve lifecycle: documents are chunked
//! and batch-added to the vector index once, after which queries flow scope
//! gate → retriever → context assembly → generator. All mutation happens
//! during ingestion; `answer` is read-only.

pub mod prompt;
pub mod rerank;
pub mod retrieve;
pub mod scope;

use std::path::Path;

use anyhow::Result;

use filingrag_core::chunker::Chunker;
use filingrag_core::traits::{Generator, PageExtractor, ScopeGate};
use filingrag_core::types::{Answer, Chunk, DocumentSource};
use filingrag_index::FlatIndex;

use crate::retrieve::{format_sources, Retriever, DEFAULT_TOP_K};

/// Fixed user-visible answer states. These travel the normal success path;
/// none of them is an error (see the generator handling below for the one
/// failure that is deliberately swallowed).
pub const NOT_INDEXED_ANSWER: &str =
    "Error: System not yet indexed. Please ingest documents first.";
pub const OUT_OF_SCOPE_ANSWER: &str =
    "This question cannot be answered based on the provided documents.";
pub const NOT_SPECIFIED_ANSWER: &str = "Not specified in the document.";
pub const GENERATION_FAILED_ANSWER: &str = "Unable to generate answer at this time.";
pub const EMPTY_GENERATION_ANSWER: &str = "Unable to generate a response.";

/// Candidates kept after reranking to build the prompt from.
const CONTEXT_TOP_N: usize = 5;
const ANSWER_MAX_TOKENS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Indexed,
}

pub struct Session {
    chunker: Chunker,
    index: FlatIndex,
    retriever: Retriever,
    extractor: Box<dyn PageExtractor>,
    scope_gate: Box<dyn ScopeGate>,
    generator: Box<dyn Generator>,
    use_reranker: bool,
    state: SessionState,
}

impl Session {
    pub fn new(
        chunker: Chunker,
        index: FlatIndex,
        retriever: Retriever,
        extractor: Box<dyn PageExtractor>,
        scope_gate: Box<dyn ScopeGate>,
        generator: Box<dyn Generator>,
        use_reranker: bool,
    ) -> Self {
        Self {
            chunker,
            index,
            retriever,
            extractor,
            scope_gate,
            generator,
            use_reranker,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Extracts, chunks, and batch-indexes the corpus in one add. A missing
    /// file is logged and skipped; ingestion continues with the rest.
    pub fn ingest(&mut self, documents: &[DocumentSource]) -> Result<()> {
        let mut all_chunks: Vec<Chunk> = Vec::new();
        for doc in documents {
            let path = Path::new(&doc.path);
            if !path.exists() {
                tracing::warn!(path = %doc.path, "document not found, skipping");
                continue;
            }
            let pages = self.extractor.extract_pages(path)?;
            let chunks = self.chunker.chunk_pages(&doc.name, &pages);
            tracing::info!(document = %doc.name, chunks = chunks.len(), "chunked document");
            all_chunks.extend(chunks);
        }

        tracing::info!(total = all_chunks.len(), "indexing chunks");
        self.index.add(&all_chunks)?;
        self.state = SessionState::Indexed;
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.index.save(dir)
    }

    pub fn load(&mut self, dir: &Path) -> Result<()> {
        self.index.load(dir)?;
        self.state = SessionState::Indexed;
        Ok(())
    }

    /// Answers a query against the indexed corpus.
    ///
    /// Generator failures never propagate: they degrade to a fixed apology
    /// while the citations for the retrieved context are still returned.
    pub fn answer(&self, query: &str) -> Result<Answer> {
        if self.state != SessionState::Indexed {
            return Ok(Answer { answer: NOT_INDEXED_ANSWER.to_string(), sources: Vec::new() });
        }

        if self.scope_gate.is_out_of_scope(query) {
            return Ok(Answer { answer: OUT_OF_SCOPE_ANSWER.to_string(), sources: Vec::new() });
        }

        let mut retrieved =
            self.retriever.retrieve(&self.index, query, DEFAULT_TOP_K, self.use_reranker)?;
        if retrieved.is_empty() {
            return Ok(Answer { answer: NOT_SPECIFIED_ANSWER.to_string(), sources: Vec::new() });
        }
        retrieved.truncate(CONTEXT_TOP_N);
        let chunks: Vec<Chunk> = retrieved.into_iter().map(|s| s.chunk).collect();

        let context = prompt::format_context(&chunks, prompt::DEFAULT_CONTEXT_CHARS);
        let rendered = prompt::create_prompt(query, &context);
        let answer = match self.generator.generate(&rendered, ANSWER_MAX_TOKENS) {
            Ok(text) if text.trim().is_empty() => EMPTY_GENERATION_ANSWER.to_string(),
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "generation failed, returning fixed apology");
                GENERATION_FAILED_ANSWER.to_string()
            }
        };

        let sources = format_sources(&chunks);
        Ok(Answer { answer, sources })
    }
}
