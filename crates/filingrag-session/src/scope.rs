use filingrag_core::traits::ScopeGate;

/// Deny-list terms: speculative or forward-looking asks, unrelated domains,
/// and opinion solicitations the corpus cannot answer.
const OUT_OF_SCOPE_TERMS: [&str; 12] = [
    "stock price forecast",
    "future price",
    "predict",
    "2025",
    "next quarter",
    "next year",
    "color",
    "painted",
    "weather",
    "climate change",
    "political",
    "stock recommendation",
];

/// Case-insensitive substring gate over a fixed term list. This is a coarse
/// lexical filter, not a semantic classifier; paraphrases will both over-
/// and under-trigger.
pub struct KeywordScopeGate {
    terms: Vec<String>,
}

impl KeywordScopeGate {
    pub fn new() -> Self {
        Self::with_terms(OUT_OF_SCOPE_TERMS.iter().map(|t| (*t).to_string()).collect())
    }

    pub fn with_terms(terms: Vec<String>) -> Self {
        Self { terms: terms.into_iter().map(|t| t.to_lowercase()).collect() }
    }
}

impl Default for KeywordScopeGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeGate for KeywordScopeGate {
    fn is_out_of_scope(&self, query: &str) -> bool {
        let query_lower = query.to_lowercase();
        self.terms.iter().any(|term| query_lower.contains(term))
    }
}
