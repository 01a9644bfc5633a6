// src/pipeline/classifier.rs
// Category classification: model-first with strict-JSON prompting, keyword
// rules as the deterministic fallback

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::{ModelClient, ModelOutcome, best_effort_json};

/// Fixed category taxonomy
pub const CATEGORIES: [&str; 7] = [
    "Billing Issue",
    "Product Defect",
    "Refund Request",
    "Technical Issue",
    "Delivery Problem",
    "Service Quality",
    "Others",
];

/// Confidence attached to keyword-rule results
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Provenance marker stored when no model output was usable
const FALLBACK_MARKER: &str = r#"{"fallback":"keyword_rules"}"#;

/// Substring rules for the fallback classifier. Multiple rules may fire;
/// the result is the union of matched labels.
const KEYWORD_RULES: &[(&str, &[&str])] = &[
    ("Billing Issue", &["bill", "invoice", "charge"]),
    ("Product Defect", &["broken", "defect", "not working", "stopped"]),
    ("Refund Request", &["refund", "money back"]),
    ("Technical Issue", &["error", "bug", "crash", "fail"]),
    ("Delivery Problem", &["deliver", "shipment", "package", "late", "delay", "missing", "not here"]),
    ("Service Quality", &["rude", "bad service", "experience"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Never empty; "Others" is the sentinel for no confident match
    pub categories: Vec<String>,
    pub confidence: f64,
}

/// Classify complaint text into one or more categories.
///
/// Returns the classification plus the raw provenance payload (the literal
/// model reply, or a fallback marker when the model was unavailable).
pub async fn classify(model: &ModelClient, text: &str) -> (Classification, String) {
    let prompt = build_prompt(text);

    match model.invoke(&prompt, None, 0.0, 256).await {
        ModelOutcome::Success(reply) => {
            if let Some(value) = best_effort_json(&reply)
                && let Some(classification) = parse_classification(&value)
            {
                return (classification, reply);
            }
            debug!(reply = %reply, "Unparseable classification reply, using keyword rules");
            (keyword_classification(text), reply)
        }
        ModelOutcome::Unavailable => {
            (keyword_classification(text), FALLBACK_MARKER.to_string())
        }
    }
}

fn build_prompt(text: &str) -> String {
    let labels = CATEGORIES
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a customer complaint classification AI. Classify the complaint text \
         into one or more categories from the list: [{labels}].\n\
         Return only a JSON object exactly like: {{\"categories\": [..], \"confidence\": 0.0}}\n\
         Complaint:\n{text}"
    )
}

/// Pull categories/confidence out of a recovered JSON object.
/// An empty categories array collapses to the "Others" sentinel.
fn parse_classification(value: &Value) -> Option<Classification> {
    let raw = value.get("categories")?.as_array()?;
    let mut categories: Vec<String> = raw
        .iter()
        .filter_map(|v| v.as_str())
        .map(String::from)
        .collect();
    if categories.is_empty() {
        categories.push("Others".to_string());
    }
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    Some(Classification {
        categories,
        confidence,
    })
}

/// Deterministic keyword-rule classifier; result is the union of every
/// rule that fires, "Others" when none do
pub fn keyword_classification(text: &str) -> Classification {
    let lower = text.to_lowercase();
    let mut categories: Vec<String> = KEYWORD_RULES
        .iter()
        .filter(|(_, terms)| terms.iter().any(|t| lower.contains(t)))
        .map(|(label, _)| label.to_string())
        .collect();

    if categories.is_empty() {
        categories.push("Others".to_string());
    }

    Classification {
        categories,
        confidence: FALLBACK_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use serde_json::json;

    fn offline_model() -> ModelClient {
        ModelClient::new(LlmConfig {
            timeout_secs: 1,
            ..Default::default()
        })
    }

    #[test]
    fn test_keyword_rules_product_defect() {
        let c = keyword_classification(
            "My washing machine stopped working after two days. It won't spin.",
        );
        assert!(c.categories.contains(&"Product Defect".to_string()));
        assert_eq!(c.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_keyword_rules_union_of_matches() {
        let c = keyword_classification(
            "I was charged twice for my subscription. Please refund the extra charge.",
        );
        assert!(c.categories.contains(&"Billing Issue".to_string()));
        assert!(c.categories.contains(&"Refund Request".to_string()));
    }

    #[test]
    fn test_keyword_rules_delivery() {
        let c = keyword_classification(
            "My package was supposed to arrive last week and it's still not here.",
        );
        assert!(c.categories.contains(&"Delivery Problem".to_string()));
    }

    #[test]
    fn test_keyword_rules_no_match_is_others() {
        let c = keyword_classification("I would like to update my postal address.");
        assert_eq!(c.categories, vec!["Others".to_string()]);
    }

    #[test]
    fn test_parse_classification_valid() {
        let value = json!({"categories": ["Billing Issue"], "confidence": 0.92});
        let c = parse_classification(&value).unwrap();
        assert_eq!(c.categories, vec!["Billing Issue".to_string()]);
        assert!((c.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_parse_classification_empty_array_becomes_others() {
        let value = json!({"categories": [], "confidence": 0.1});
        let c = parse_classification(&value).unwrap();
        assert_eq!(c.categories, vec!["Others".to_string()]);
    }

    #[test]
    fn test_parse_classification_missing_field() {
        assert!(parse_classification(&json!({"confidence": 0.5})).is_none());
    }

    #[tokio::test]
    async fn test_classify_offline_never_empty() {
        let model = offline_model();
        for text in [
            "refund please",
            "the app crashes",
            "lovely weather today",
            "",
        ] {
            let (c, provenance) = classify(&model, text).await;
            assert!(!c.categories.is_empty(), "empty categories for {text:?}");
            assert_eq!(provenance, FALLBACK_MARKER);
        }
    }
}
