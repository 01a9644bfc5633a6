// src/pipeline/keywords.rs
// Frequency-ranked phrase extraction from complaint text

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Default number of phrases returned
pub const DEFAULT_TOP_N: usize = 6;

/// Score boost for the literal token "urgent"; downstream severity
/// escalation depends on it surfacing in the keyword list
const URGENT_BOOST: u32 = 5;

/// Bigrams are weighted over unigrams to favor phrases like "washing machine"
const BIGRAM_WEIGHT: u32 = 2;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]{2,}").expect("static regex"));

const STOPWORDS: &[&str] = &[
    "the", "and", "a", "an", "of", "to", "in", "for", "on", "with", "is", "it", "that", "this",
    "i", "we", "you", "was", "are", "be", "my", "have", "has", "had", "not", "but", "or", "as",
    "by", "at", "from",
];

/// Extract up to `top_n` phrases, ranked by merged unigram/bigram frequency.
///
/// Deterministic: ties keep first-seen order (stable sort over insertion
/// order). Empty input yields an empty list.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .collect();

    // One namespace for unigrams and bigrams, insertion order preserved
    let mut order: Vec<String> = Vec::new();
    let mut scores: HashMap<String, u32> = HashMap::new();
    let mut bump = |term: String, by: u32| {
        if !scores.contains_key(&term) {
            order.push(term.clone());
        }
        *scores.entry(term).or_insert(0) += by;
    };

    for word in &words {
        bump(word.to_string(), 1);
    }
    for pair in words.windows(2) {
        bump(format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
    }

    // "urgent" is boosted even when tokenization dropped it
    if lower.contains("urgent") {
        bump("urgent".to_string(), URGENT_BOOST);
    }

    let mut ranked: Vec<(String, u32)> = order
        .into_iter()
        .map(|term| {
            let score = scores[&term];
            (term, score)
        })
        .collect();
    // sort_by is stable: equal scores keep first-seen order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked.into_iter().take(top_n).map(|(term, _)| term).collect()
}
