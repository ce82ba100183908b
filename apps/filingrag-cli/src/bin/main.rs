use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use filingrag_core::chunker::{Chunker, ChunkingConfig};
use filingrag_core::config::Config;
use filingrag_core::extract::FileExtractor;
use filingrag_core::types::DocumentSource;
use filingrag_embed::get_embedder;
use filingrag_index::FlatIndex;
use filingrag_llm::get_default_generator;
use filingrag_session::rerank::LexicalReranker;
use filingrag_session::retrieve::Retriever;
use filingrag_session::scope::KeywordScopeGate;
use filingrag_session::Session;

const USAGE: &str = "Usage: filingrag <index|query|evaluate> [--model <name>] \
[--embedding-model <dir>] [--index-dir <dir>] [--question \"<text>\"] [--no-rerank]";

struct CliArgs {
    mode: String,
    model: Option<String>,
    embedding_model: Option<String>,
    index_dir: Option<String>,
    question: Option<String>,
    no_rerank: bool,
}

fn parse_args() -> CliArgs {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let mode = args.remove(0);

    let mut parsed = CliArgs {
        mode,
        model: None,
        embedding_model: None,
        index_dir: None,
        question: None,
        no_rerank: false,
    };
    let take_value = |args: &[String], i: usize, flag: &str| -> String {
        args.get(i + 1).cloned().unwrap_or_else(|| {
            eprintln!("Error: {flag} requires a value\n{USAGE}");
            std::process::exit(1)
        })
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--model" | "-m" => {
                parsed.model = Some(take_value(&args, i, "--model"));
                i += 1;
            }
            "--embedding-model" => {
                parsed.embedding_model = Some(take_value(&args, i, "--embedding-model"));
                i += 1;
            }
            "--index-dir" => {
                parsed.index_dir = Some(take_value(&args, i, "--index-dir"));
                i += 1;
            }
            "--question" | "-q" => {
                parsed.question = Some(take_value(&args, i, "--question"));
                i += 1;
            }
            "--no-rerank" => parsed.no_rerank = true,
            other => {
                eprintln!("Error: unknown argument '{other}'\n{USAGE}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    parsed
}

#[derive(Debug, Clone, Deserialize)]
struct QuestionRecord {
    id: String,
    question: String,
}

#[derive(Debug, Serialize)]
struct EvalRecord {
    question_id: String,
    question: String,
    answer: String,
    sources: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let args = parse_args();

    let index_dir = PathBuf::from(args.index_dir.clone().unwrap_or_else(|| {
        config.get("index.dir").unwrap_or_else(|_| "./rag_index".to_string())
    }));
    let documents = configured_documents(&config);
    let use_reranker =
        !args.no_rerank && config.get("retrieval.use_reranker").unwrap_or(true);

    let mut session = build_session(&config, &args, use_reranker)?;

    match args.mode.as_str() {
        "index" => {
            warn_missing(&documents);
            session.ingest(&documents)?;
            session.save(&index_dir)?;
            println!("Index saved to {}", index_dir.display());
        }
        "query" => {
            let question = args.question.clone().unwrap_or_else(|| {
                eprintln!("Error: query mode requires --question \"<text>\"\n{USAGE}");
                std::process::exit(1)
            });
            ensure_indexed(&mut session, &index_dir, &documents)?;

            let result = session.answer(&question)?;
            println!("\nQuestion: {question}");
            println!("\nAnswer:\n{}", result.answer);
            println!("\nSources:");
            for source in &result.sources {
                println!("  - {source}");
            }
        }
        "evaluate" => {
            ensure_indexed(&mut session, &index_dir, &documents)?;
            let questions = load_questions(&config)?;

            let mut results = Vec::with_capacity(questions.len());
            for record in &questions {
                println!("[{}] {}", record.id, record.question);
                let answer = session.answer(&record.question)?;
                results.push(EvalRecord {
                    question_id: record.id.clone(),
                    question: record.question.clone(),
                    answer: answer.answer,
                    sources: answer.sources,
                });
            }

            let out_path =
                format!("eval_results_{}.json", chrono::Utc::now().format("%Y%m%d-%H%M%S"));
            fs::write(&out_path, serde_json::to_vec_pretty(&results)?)?;
            println!("Evaluation results written to {out_path}");
        }
        other => {
            eprintln!("Unknown mode: {other}\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn build_session(config: &Config, args: &CliArgs, use_reranker: bool) -> anyhow::Result<Session> {
    let chunker = Chunker::new(ChunkingConfig {
        chunk_size: config.get("chunking.chunk_size").unwrap_or(500),
        overlap: config.get("chunking.overlap").unwrap_or(50),
    })?;

    let embedder = get_embedder(args.embedding_model.as_deref().map(Path::new))?;

    let endpoint: String = config
        .get("llm.endpoint")
        .unwrap_or_else(|_| "http://127.0.0.1:8000/v1/chat/completions".to_string());
    let model = args.model.clone().unwrap_or_else(|| {
        config
            .get("llm.model")
            .unwrap_or_else(|_| "microsoft/Phi-3-mini-4k-instruct".to_string())
    });
    let api_key = config.get("llm.api_key").ok().or_else(|| env::var("LLM_API_KEY").ok());
    let generator = get_default_generator(endpoint, model, api_key)?;

    Ok(Session::new(
        chunker,
        FlatIndex::new(embedder),
        Retriever::new(Box::new(LexicalReranker::new())),
        Box::new(FileExtractor::new()),
        Box::new(KeywordScopeGate::new()),
        generator,
        use_reranker,
    ))
}

/// Corpus list from `[[documents]]` in config, falling back to the default
/// pair of filings.
fn configured_documents(config: &Config) -> Vec<DocumentSource> {
    config.get("documents").unwrap_or_else(|_| {
        vec![
            DocumentSource {
                path: "10-Q4-2024-As-Filed.pdf".to_string(),
                name: "Apple 10-K".to_string(),
            },
            DocumentSource {
                path: "tsla-20231231-gen.pdf".to_string(),
                name: "Tesla 10-K".to_string(),
            },
        ]
    })
}

fn warn_missing(documents: &[DocumentSource]) {
    for doc in documents {
        if !Path::new(&doc.path).exists() {
            tracing::warn!(path = %doc.path, "configured document not found");
        }
    }
}

/// Loads the saved index when the directory exists, otherwise ingests the
/// configured corpus and saves it before serving.
fn ensure_indexed(
    session: &mut Session,
    index_dir: &Path,
    documents: &[DocumentSource],
) -> anyhow::Result<()> {
    if index_dir.exists() {
        println!("Loading index from {}", index_dir.display());
        session.load(index_dir)
    } else {
        println!("Index not found. Creating index...");
        warn_missing(documents);
        session.ingest(documents)?;
        session.save(index_dir)
    }
}

fn load_questions(config: &Config) -> anyhow::Result<Vec<QuestionRecord>> {
    if let Ok(path) = config.get::<String>("eval.questions_file") {
        let data = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read questions file {path}: {e}"))?;
        let records: Vec<QuestionRecord> = serde_json::from_str(&data)
            .map_err(|e| anyhow::anyhow!("malformed questions file {path}: {e}"))?;
        return Ok(records);
    }
    Ok(default_battery())
}

fn default_battery() -> Vec<QuestionRecord> {
    let questions = [
        ("q1", "What was Apple's total net sales in fiscal 2024?"),
        ("q2", "What were Tesla's total revenues for 2023?"),
        ("q3", "How many shares of common stock were outstanding?"),
        ("q4", "Which operating segments does Apple report?"),
        ("q5", "What does Tesla disclose about supply chain risk?"),
    ];
    questions
        .into_iter()
        .map(|(id, question)| QuestionRecord { id: id.to_string(), question: question.to_string() })
        .collect()
}
