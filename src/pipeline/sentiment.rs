// src/pipeline/sentiment.rs
// Sentiment analysis: model-first, lexical-polarity fallback

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::db::types::Sentiment;
use crate::llm::ModelClient;

/// Polarity thresholds for the lexical fallback
const POSITIVE_THRESHOLD: f64 = 0.1;
const NEGATIVE_THRESHOLD: f64 = -0.1;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+('[a-z]+)?").expect("static regex"));

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "love", "happy", "pleased", "satisfied",
    "wonderful", "fantastic", "helpful", "thank", "thanks", "appreciate", "awesome",
    "perfect", "best", "quick", "friendly", "smooth",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "angry", "upset", "disappointed",
    "frustrating", "frustrated", "broken", "useless", "rude", "poor", "unacceptable",
    "slow", "late", "problem", "issue", "crash", "failed", "wrong", "never",
];

/// Classify sentiment of complaint text.
///
/// The model is asked for a single-word label; the first reply line must
/// match one of the three labels or the reply is discarded. Any other path
/// lands on the lexical fallback, which cannot fail.
pub async fn analyze(model: &ModelClient, text: &str) -> Sentiment {
    let prompt = format!(
        "Detect sentiment of the following text as Positive, Neutral, or Negative. \
         Return only the label.\nText:\n{text}"
    );

    if let Some(reply) = model.invoke(&prompt, None, 0.0, 8).await.text() {
        if let Some(label) = reply.lines().next().and_then(Sentiment::parse) {
            return label;
        }
        debug!(reply = %reply, "Unusable sentiment reply, using lexical fallback");
    }

    lexical_sentiment(text)
}

/// Deterministic fallback: polarity over small positive/negative lexicons
pub fn lexical_sentiment(text: &str) -> Sentiment {
    let polarity = polarity(text);
    if polarity > POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if polarity < NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Polarity in [-1, 1]: (positive - negative) / matched tokens, 0 when no
/// lexicon word appears
fn polarity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut positive = 0i64;
    let mut negative = 0i64;

    for token in WORD_RE.find_iter(&lower).map(|m| m.as_str()) {
        if POSITIVE_WORDS.contains(&token) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&token) {
            negative += 1;
        }
    }

    let matched = positive + negative;
    if matched == 0 {
        return 0.0;
    }
    (positive - negative) as f64 / matched as f64
}
