use filingrag_core::traits::Reranker;

/// Word-overlap relevance scorer: the fraction of query words contained in
/// the candidate text, case-insensitive. A cheap stand-in for a
/// cross-encoder; anything implementing `Reranker` can replace it.
#[derive(Debug, Default)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }
}

impl Reranker for LexicalReranker {
    fn score(&self, query: &str, candidates: &[String]) -> anyhow::Result<Vec<f32>> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();
        let scores = candidates
            .iter()
            .map(|text| {
                if query_words.is_empty() {
                    return 0.0;
                }
                let content_lower = text.to_lowercase();
                let mut hits = 0.0f32;
                for word in &query_words {
                    if content_lower.contains(word) {
                        hits += 1.0;
                    }
                }
                hits / query_words.len() as f32
            })
            .collect();
        Ok(scores)
    }
}
