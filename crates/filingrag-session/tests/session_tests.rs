use std::fs;
use std::path::Path;

use anyhow::anyhow;
use tempfile::TempDir;

use filingrag_core::chunker::{Chunker, ChunkingConfig};
use filingrag_core::extract::FileExtractor;
use filingrag_core::traits::Generator;
use filingrag_core::types::DocumentSource;
use filingrag_embed::FakeEmbedder;
use filingrag_index::FlatIndex;
use filingrag_session::rerank::LexicalReranker;
use filingrag_session::retrieve::Retriever;
use filingrag_session::scope::KeywordScopeGate;
use filingrag_session::{
    Session, SessionState, GENERATION_FAILED_ANSWER, NOT_INDEXED_ANSWER, OUT_OF_SCOPE_ANSWER,
};

struct CannedGenerator;

impl Generator for CannedGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> anyhow::Result<String> {
        Ok("Net sales were $391.0 billion [Synthetic 10-K - Page 1].".to_string())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> anyhow::Result<String> {
        Err(anyhow!("inference backend offline"))
    }
}

fn make_session(generator: Box<dyn Generator>, use_reranker: bool) -> Session {
    Session::new(
        Chunker::new(ChunkingConfig { chunk_size: 500, overlap: 50 }).expect("chunker"),
        FlatIndex::new(Box::new(FakeEmbedder::new(64))),
        Retriever::new(Box::new(LexicalReranker::new())),
        Box::new(FileExtractor::new()),
        Box::new(KeywordScopeGate::new()),
        generator,
        use_reranker,
    )
}

/// Page 1 is exactly 600 chars, page 2 exactly 200, separated by a form
/// feed so the extractor reports two pages.
fn write_synthetic_filing(dir: &Path) -> String {
    let page1 = "net sales increased ".repeat(30);
    assert_eq!(page1.chars().count(), 600);
    let page2 = format!("{:<200}", "operating lease obligations and interest expense details");
    assert_eq!(page2.chars().count(), 200);
    let path = dir.join("synthetic.txt");
    fs::write(&path, format!("{page1}\u{c}{page2}")).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn answer_before_ingest_returns_not_indexed() {
    let session = make_session(Box::new(CannedGenerator), true);
    assert_eq!(session.state(), SessionState::Uninitialized);

    let result = session.answer("What were net sales?").expect("answer");
    assert_eq!(result.answer, NOT_INDEXED_ANSWER);
    assert!(result.sources.is_empty());
}

#[test]
fn scope_gate_short_circuits_before_retrieval() {
    // An indexed session with an empty index: any retrieval attempt would
    // fail with the not-initialized error, so a clean refusal proves the
    // gate fired before retrieval.
    let mut session = make_session(Box::new(CannedGenerator), true);
    session.ingest(&[]).expect("ingest");
    assert_eq!(session.state(), SessionState::Indexed);

    for query in ["Predict the stock price", "what happens in 2025?"] {
        let result = session.answer(query).expect("answer");
        assert_eq!(result.answer, OUT_OF_SCOPE_ANSWER, "query: {query}");
        assert!(result.sources.is_empty());
    }
}

#[test]
fn end_to_end_synthetic_two_page_filing() {
    let tmp = TempDir::new().unwrap();
    let path = write_synthetic_filing(tmp.path());

    let mut session = make_session(Box::new(CannedGenerator), true);
    session
        .ingest(&[DocumentSource { path, name: "Synthetic 10-K".to_string() }])
        .expect("ingest");

    // 600 + separator + 200 chars with chunk_size=500/overlap=50 yields
    // windows at 0 and 450, both starting inside page 1's range.
    assert_eq!(session.index_len(), 2);

    let result = session.answer("How did net sales develop?").expect("answer");
    assert!(result.answer.contains("$391.0 billion"));
    assert_eq!(result.sources, vec!["Synthetic 10-K, p. 1".to_string()]);
}

#[test]
fn generation_failure_degrades_to_fixed_apology() {
    let tmp = TempDir::new().unwrap();
    let path = write_synthetic_filing(tmp.path());

    let mut session = make_session(Box::new(FailingGenerator), false);
    session
        .ingest(&[DocumentSource { path, name: "Synthetic 10-K".to_string() }])
        .expect("ingest");

    let result = session.answer("How did net sales develop?").expect("answer");
    assert_eq!(result.answer, GENERATION_FAILED_ANSWER, "failure never propagates");
    assert!(!result.sources.is_empty(), "citations still accompany the apology");
}

#[test]
fn missing_document_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let path = write_synthetic_filing(tmp.path());

    let mut session = make_session(Box::new(CannedGenerator), false);
    session
        .ingest(&[
            DocumentSource { path: "/nonexistent/filing.pdf".to_string(), name: "Ghost".to_string() },
            DocumentSource { path, name: "Synthetic 10-K".to_string() },
        ])
        .expect("ingest continues past the missing file");

    assert_eq!(session.index_len(), 2, "only the present document was indexed");
}

#[test]
fn save_and_load_restore_serving_state() {
    let tmp = TempDir::new().unwrap();
    let path = write_synthetic_filing(tmp.path());
    let index_dir = tmp.path().join("rag_index");

    let mut session = make_session(Box::new(CannedGenerator), true);
    session
        .ingest(&[DocumentSource { path, name: "Synthetic 10-K".to_string() }])
        .expect("ingest");
    session.save(&index_dir).expect("save");

    let mut restored = make_session(Box::new(CannedGenerator), true);
    restored.load(&index_dir).expect("load");
    assert_eq!(restored.state(), SessionState::Indexed);
    assert_eq!(restored.index_len(), 2);

    let result = restored.answer("How did net sales develop?").expect("answer");
    assert_eq!(result.sources, vec!["Synthetic 10-K, p. 1".to_string()]);
}
