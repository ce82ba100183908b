use filingrag_core::traits::{Reranker, ScopeGate};
use filingrag_core::types::Chunk;
use filingrag_embed::FakeEmbedder;
use filingrag_index::FlatIndex;
use filingrag_session::prompt::{create_prompt, format_context, NO_CONTEXT_SENTINEL};
use filingrag_session::rerank::LexicalReranker;
use filingrag_session::retrieve::{format_sources, Retriever};
use filingrag_session::scope::KeywordScopeGate;

fn chunk(id: &str, text: &str, document: &str, page: Option<u32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        document: document.to_string(),
        page,
        position: 0,
    }
}

fn indexed(chunks: &[Chunk]) -> FlatIndex {
    let mut index = FlatIndex::new(Box::new(FakeEmbedder::new(64)));
    index.add(chunks).expect("add");
    index
}

/// Scores 5.0 for candidates mentioning leases, 0.0 otherwise.
struct LeaseBooster;

impl Reranker for LeaseBooster {
    fn score(&self, _query: &str, candidates: &[String]) -> anyhow::Result<Vec<f32>> {
        Ok(candidates.iter().map(|t| if t.contains("lease") { 5.0 } else { 0.0 }).collect())
    }
}

/// Scores every candidate identically.
struct FlatScorer;

impl Reranker for FlatScorer {
    fn score(&self, _query: &str, candidates: &[String]) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.0; candidates.len()])
    }
}

fn sample_chunks() -> Vec<Chunk> {
    vec![
        chunk("A_0", "total net sales increased during fiscal 2024", "A", Some(1)),
        chunk("A_1", "operating lease obligations and commitments", "A", Some(7)),
        chunk("A_2", "research and development expense grew", "A", Some(3)),
    ]
}

#[test]
fn rerank_disabled_returns_vector_order() {
    let index = indexed(&sample_chunks());
    let retriever = Retriever::new(Box::new(LexicalReranker::new()));

    let raw = index.search("net sales", 3).expect("search");
    let retrieved = retriever.retrieve(&index, "net sales", 3, false).expect("retrieve");

    let raw_ids: Vec<&str> = raw.iter().map(|s| s.chunk.id.as_str()).collect();
    let ids: Vec<&str> = retrieved.iter().map(|s| s.chunk.id.as_str()).collect();
    assert_eq!(ids, raw_ids, "stage-1 order passes through untouched");
}

#[test]
fn rerank_reorders_by_new_scores() {
    let index = indexed(&sample_chunks());
    let retriever = Retriever::new(Box::new(LeaseBooster));

    let retrieved = retriever.retrieve(&index, "net sales", 3, true).expect("retrieve");
    assert_eq!(retrieved[0].chunk.id, "A_1", "boosted candidate moves to the top");
    assert_eq!(retrieved[0].score, 5.0, "reranker score replaces the vector score");
}

#[test]
fn rerank_ties_keep_stage_one_order() {
    let index = indexed(&sample_chunks());
    let retriever = Retriever::new(Box::new(FlatScorer));

    let raw = index.search("net sales", 3).expect("search");
    let retrieved = retriever.retrieve(&index, "net sales", 3, true).expect("retrieve");

    let raw_ids: Vec<&str> = raw.iter().map(|s| s.chunk.id.as_str()).collect();
    let ids: Vec<&str> = retrieved.iter().map(|s| s.chunk.id.as_str()).collect();
    assert_eq!(ids, raw_ids, "equal scores fall back to the vector order");
}

#[test]
fn lexical_reranker_scores_word_overlap() {
    let reranker = LexicalReranker::new();
    let scores = reranker
        .score(
            "Net SALES growth",
            &["net sales grew strongly".to_string(), "lease obligations".to_string()],
        )
        .expect("score");
    assert!((scores[0] - 2.0 / 3.0).abs() < 1e-6, "two of three query words matched");
    assert_eq!(scores[1], 0.0);
}

#[test]
fn format_sources_dedups_preserving_first_appearance() {
    let chunks = vec![
        chunk("A_0", "t", "Apple 10-K", Some(12)),
        chunk("A_1", "t", "Apple 10-K", Some(12)),
        chunk("T_0", "t", "Tesla 10-K", Some(3)),
        chunk("A_2", "t", "Apple 10-K", None),
    ];
    let sources = format_sources(&chunks);
    assert_eq!(sources, vec!["Apple 10-K, p. 12", "Tesla 10-K, p. 3", "Apple 10-K"]);
}

#[test]
fn format_context_empty_returns_sentinel() {
    assert_eq!(format_context(&[], 2000), NO_CONTEXT_SENTINEL);
}

#[test]
fn format_context_tags_and_separates_blocks() {
    let chunks = vec![
        chunk("A_0", "first passage", "Apple 10-K", Some(2)),
        chunk("A_1", "second passage", "Apple 10-K", None),
    ];
    let context = format_context(&chunks, 2000);
    assert!(context.starts_with("[Apple 10-K - Page 2]\nfirst passage"));
    assert!(context.contains("\n\n---\n\n"));
    assert!(context.contains("[Apple 10-K]\nsecond passage"), "pageless chunks cite bare document");
}

#[test]
fn format_context_is_length_bounded_without_truncation() {
    let long = "x".repeat(300);
    let chunks = vec![
        chunk("A_0", &long, "A", Some(1)),
        chunk("A_1", &long, "A", Some(2)),
        chunk("A_2", &long, "A", Some(3)),
    ];
    let context = format_context(&chunks, 700);
    assert!(context.contains("Page 1"));
    assert!(context.contains("Page 2"));
    assert!(!context.contains("Page 3"), "third block would exceed the budget");
    // Included blocks carry their full text.
    assert_eq!(context.matches(&long).count(), 2);
}

#[test]
fn format_context_always_includes_first_block() {
    let long = "y".repeat(500);
    let chunks = vec![chunk("A_0", &long, "A", Some(1))];
    let context = format_context(&chunks, 10);
    assert!(context.contains(&long), "first block is admitted even over budget");
}

#[test]
fn create_prompt_carries_context_question_and_citation_cue() {
    let rendered = create_prompt("What was revenue?", "[A - Page 1]\nrevenue was X");
    assert!(rendered.contains("Context:\n[A - Page 1]\nrevenue was X"));
    assert!(rendered.contains("Question: What was revenue?"));
    assert!(rendered.contains("[Document - Page X]"));
    assert!(rendered.trim_end().ends_with("Answer:"));
}

#[test]
fn scope_gate_matches_case_insensitively() {
    let gate = KeywordScopeGate::new();
    assert!(gate.is_out_of_scope("Can you PREDICT the next move?"));
    assert!(gate.is_out_of_scope("What will happen in 2025?"));
    assert!(gate.is_out_of_scope("What's the weather like?"));
    assert!(!gate.is_out_of_scope("What was Apple's revenue in fiscal 2024?"));
}

#[test]
fn scope_gate_accepts_custom_terms() {
    let gate = KeywordScopeGate::with_terms(vec!["Bitcoin".to_string()]);
    assert!(gate.is_out_of_scope("what about bitcoin holdings"));
    assert!(!gate.is_out_of_scope("predict the stock"), "custom terms replace the defaults");
}
