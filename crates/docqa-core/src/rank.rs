//! Lexical relevance ranking.
//!
//! Scores chunks against a question by lexical overlap and selects the
//! top-K as grounding context. Pure and deterministic: identical inputs
//! always yield identical output, and chunks with equal scores keep their
//! original document order.
//!
//! # Scoring
//!
//! Both the question and each chunk are tokenized by splitting on runs of
//! non-alphanumeric characters and lowercasing. A chunk's score is the
//! number of distinct question tokens longer than three characters that
//! appear as a **substring** of any chunk token. Substring containment
//! (rather than exact match) tolerates simple morphological variants —
//! "budget" matches "budgets" — at the cost of occasional false positives
//! on short common substrings; that trade-off is deliberate.

use std::collections::BTreeSet;

use crate::models::Chunk;

/// Question tokens must be longer than this to participate in scoring.
const MIN_QUESTION_TOKEN_CHARS: usize = 4;

/// Select the `top_k` chunks most relevant to `question`.
///
/// Returns an empty vector when `chunks` is empty; callers treat "no
/// context" as a distinct condition, not an error. Recomputed fresh per
/// question — results are never cached across questions.
pub fn rank(question: &str, chunks: &[Chunk], top_k: usize) -> Vec<Chunk> {
    if chunks.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let question_tokens: BTreeSet<String> = tokenize(question)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_QUESTION_TOKEN_CHARS)
        .collect();

    let mut scored: Vec<(usize, &Chunk)> = chunks
        .iter()
        .map(|chunk| {
            let chunk_tokens = tokenize(&chunk.text);
            let score = question_tokens
                .iter()
                .filter(|qt| chunk_tokens.iter().any(|ct| ct.contains(qt.as_str())))
                .count();
            (score, chunk)
        })
        .collect();

    // Stable sort: equal scores preserve original chunk order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(top_k)
        .map(|(_, chunk)| chunk.clone())
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
