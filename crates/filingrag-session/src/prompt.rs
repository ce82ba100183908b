//! Citation-tagged context assembly and prompt construction.

use filingrag_core::types::Chunk;

pub const NO_CONTEXT_SENTINEL: &str = "No relevant context available.";
pub const DEFAULT_CONTEXT_CHARS: usize = 2000;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = "You are an assistant that answers user questions using ONLY the \
provided context. Cite sources clearly using the format [Document - Page X]. Do NOT add \
information that is not in the context. If the answer is not in the context, respond: 'The \
information is not available in the provided documents.'";

fn citation(chunk: &Chunk) -> String {
    match chunk.page {
        Some(page) => format!("[{} - Page {}]", chunk.document, page),
        None => format!("[{}]", chunk.document),
    }
}

/// Builds one citation block per chunk, concatenated in the given rank
/// order with a visible separator. Blocks are added greedily until the next
/// one would push the running total past `max_length`; the first block is
/// always admitted and no block is ever truncated mid-text. Lengths are
/// counted in characters over block text only.
pub fn format_context(chunks: &[Chunk], max_length: usize) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut current_length = 0usize;
    for chunk in chunks {
        let text = chunk.text.trim();
        if text.is_empty() {
            continue;
        }
        let block = format!("{}\n{}", citation(chunk), text);
        let block_len = block.chars().count();
        if current_length + block_len > max_length && !parts.is_empty() {
            break;
        }
        current_length += block_len;
        parts.push(block);
    }

    if parts.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    parts.join(BLOCK_SEPARATOR)
}

/// Final generation prompt: fixed system instruction, context block,
/// question, and the concise-answer-with-citations cue.
pub fn create_prompt(query: &str, context: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nContext:\n{context}\n\nQuestion: {query}\n\n\
         Answer concisely, citing each claim inline as [Document - Page X].\nAnswer:"
    )
}
