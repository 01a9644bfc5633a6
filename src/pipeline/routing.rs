// src/pipeline/routing.rs
// Severity + department decision: model-first, fully deterministic
// rule-based fallback with a monotonic escalation merge

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::db::types::{Sentiment, Severity};
use crate::llm::{ModelClient, ModelOutcome, best_effort_json};

/// Provenance marker stored when no model output was usable
const FALLBACK_MARKER: &str = r#"{"fallback":"heuristic"}"#;

/// Terms that force severity to Urgent before any other rule runs
const URGENT_TERMS: &[&str] = &["urgent", "asap", "immediately", "need it urgently"];

/// Product-failure indicators; escalate to at least High
const DEFECT_TERMS: &[&str] = &[
    "not working",
    "stopped working",
    "broken",
    "malfunction",
    "won't start",
    "won't spin",
];

/// Billing-fraud indicators; escalate to at least High
const BILLING_TERMS: &[&str] = &["refund", "charged", "overcharged", "double charge", "fraud"];

/// Delivery-delay indicators; escalate to at least Medium
const DELAY_TERMS: &[&str] = &["late", "delay", "missing", "not here"];

/// Safety-critical terms; override everything to Urgent
const SAFETY_TERMS: &[&str] = &["life-threatening", "danger", "hazard"];

#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub severity: Severity,
    pub department: String,
    pub justification: String,
}

/// Decide severity and routing department for a complaint.
///
/// Returns the decision plus the raw provenance payload (the literal model
/// reply, or a fallback marker).
pub async fn route(
    model: &ModelClient,
    config: &Config,
    text: &str,
    categories: &[String],
    sentiment: Option<Sentiment>,
    keywords: &[String],
) -> (RoutingDecision, String) {
    let prompt = build_prompt(text, categories, sentiment, keywords);

    match model.invoke(&prompt, None, 0.0, 256).await {
        ModelOutcome::Success(reply) => {
            if let Some(value) = best_effort_json(&reply)
                && let Some(decision) = parse_decision(&value, config, categories)
            {
                return (decision, reply);
            }
            debug!(reply = %reply, "Unparseable routing reply, using heuristic fallback");
            (heuristic_route(config, text, categories, sentiment, keywords), reply)
        }
        ModelOutcome::Unavailable => (
            heuristic_route(config, text, categories, sentiment, keywords),
            FALLBACK_MARKER.to_string(),
        ),
    }
}

fn build_prompt(
    text: &str,
    categories: &[String],
    sentiment: Option<Sentiment>,
    keywords: &[String],
) -> String {
    let mut prompt = format!(
        "Based on this complaint text, assign a severity level (Low, Medium, High, Urgent) \
         and choose the best routing department. Return JSON like: \
         {{\"severity\": \"High\", \"routed_department\": \"Logistics\", \"justification\": \"...\"}}\n\
         Complaint:\n{text}\nCategories: {}",
        categories.join(",")
    );
    if let Some(sentiment) = sentiment {
        prompt.push_str(&format!("\nDetected sentiment: {sentiment}"));
    }
    if !keywords.is_empty() {
        prompt.push_str(&format!("\nDetected keywords: {}", keywords.join(",")));
    }
    prompt
}

/// Validate a recovered JSON decision. An unknown severity label rejects
/// the whole reply; the caller then falls back to the heuristic.
fn parse_decision(value: &Value, config: &Config, categories: &[String]) -> Option<RoutingDecision> {
    let severity = value
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse)?;
    let department = value
        .get("routed_department")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default_department(config, categories));
    let justification = value
        .get("justification")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Some(RoutingDecision {
        severity,
        department,
        justification,
    })
}

/// Deterministic fallback. Escalation is monotonic: after the urgent-term
/// ceiling, every step merges with `max` and can only raise severity; the
/// safety-critical override at the end may force Urgent outright.
pub fn heuristic_route(
    config: &Config,
    text: &str,
    categories: &[String],
    sentiment: Option<Sentiment>,
    keywords: &[String],
) -> RoutingDecision {
    let lower = text.to_lowercase();
    let keywords_lower: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let mentions =
        |terms: &[&str]| terms.iter().any(|t| lower.contains(t) || keywords_lower.iter().any(|k| k == t));

    let mut severity = Severity::Low;

    // Explicit urgency is a ceiling override later steps cannot lower
    if mentions(URGENT_TERMS) {
        severity = Severity::Urgent;
    }

    if severity != Severity::Urgent {
        severity = match sentiment {
            Some(Sentiment::Negative) => Severity::High,
            Some(Sentiment::Neutral) => Severity::Medium,
            Some(Sentiment::Positive) => Severity::Low,
            None => severity,
        };
    }

    if severity != Severity::Urgent && (mentions(DEFECT_TERMS) || mentions(BILLING_TERMS)) {
        severity = severity.max(Severity::High);
    }

    if severity != Severity::Urgent && mentions(DELAY_TERMS) {
        severity = severity.max(Severity::Medium);
    }

    // Safety-critical language overrides all prior steps
    if mentions(SAFETY_TERMS) {
        severity = Severity::Urgent;
    }

    RoutingDecision {
        severity,
        department: default_department(config, categories),
        justification: "Fallback heuristic: urgency and category rules".to_string(),
    }
}

/// Department for the first category; "General Support" when the list is
/// empty or the category is unmapped
fn default_department(config: &Config, categories: &[String]) -> String {
    categories
        .first()
        .map(|c| config.department_for(c))
        .unwrap_or_else(|| "General Support".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config::default()
    }

    fn route_text(text: &str, categories: &[&str], sentiment: Option<Sentiment>) -> RoutingDecision {
        let categories: Vec<String> = categories.iter().map(|s| s.to_string()).collect();
        heuristic_route(&config(), text, &categories, sentiment, &[])
    }

    #[test]
    fn test_urgent_term_forces_urgent_regardless_of_sentiment() {
        for sentiment in [
            Some(Sentiment::Positive),
            Some(Sentiment::Neutral),
            Some(Sentiment::Negative),
            None,
        ] {
            let d = route_text("I need this fixed urgently", &["Others"], sentiment);
            assert_eq!(d.severity, Severity::Urgent, "sentiment {sentiment:?}");
        }
    }

    #[test]
    fn test_urgent_term_in_keywords_only() {
        let keywords = vec!["urgent".to_string()];
        let d = heuristic_route(
            &config(),
            "please have a look at my ticket",
            &["Others".to_string()],
            Some(Sentiment::Positive),
            &keywords,
        );
        assert_eq!(d.severity, Severity::Urgent);
    }

    #[test]
    fn test_sentiment_baseline() {
        assert_eq!(
            route_text("nondescript text", &["Others"], Some(Sentiment::Negative)).severity,
            Severity::High
        );
        assert_eq!(
            route_text("nondescript text", &["Others"], Some(Sentiment::Neutral)).severity,
            Severity::Medium
        );
        assert_eq!(
            route_text("nondescript text", &["Others"], Some(Sentiment::Positive)).severity,
            Severity::Low
        );
    }

    #[test]
    fn test_defect_escalates_to_high_not_urgent() {
        let d = route_text(
            "My washing machine stopped working after two days. It's making a loud noise and won't spin.",
            &["Product Defect"],
            Some(Sentiment::Neutral),
        );
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.department, "Product Engineering");
    }

    #[test]
    fn test_billing_fraud_escalates_to_high() {
        let d = route_text(
            "I was charged twice for my subscription. Please refund the extra charge.",
            &["Billing Issue", "Refund Request"],
            Some(Sentiment::Neutral),
        );
        assert!(d.severity >= Severity::High);
        assert_eq!(d.department, "Accounts");
    }

    #[test]
    fn test_delay_only_is_medium() {
        let d = route_text(
            "My package was supposed to arrive last week and it's still not here.",
            &["Delivery Problem"],
            Some(Sentiment::Neutral),
        );
        assert_eq!(d.severity, Severity::Medium);
        assert_eq!(d.department, "Logistics");
    }

    #[test]
    fn test_merge_never_downgrades_negative_sentiment() {
        // Negative baseline High; the Medium delay merge must not lower it
        let d = route_text(
            "The delivery is late and I am extremely disappointed.",
            &["Delivery Problem"],
            Some(Sentiment::Negative),
        );
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn test_safety_terms_override_everything() {
        let d = route_text(
            "The exposed wiring is a fire hazard.",
            &["Product Defect"],
            Some(Sentiment::Positive),
        );
        assert_eq!(d.severity, Severity::Urgent);
    }

    #[test]
    fn test_department_defaults_when_categories_empty() {
        let d = route_text("hello", &[], Some(Sentiment::Positive));
        assert_eq!(d.department, "General Support");
    }

    #[test]
    fn test_department_defaults_when_unmapped() {
        let d = route_text("hello", &["Mystery Category"], None);
        assert_eq!(d.department, "General Support");
    }

    #[test]
    fn test_parse_decision_valid() {
        let value = json!({
            "severity": "High",
            "routed_department": "Logistics",
            "justification": "late delivery"
        });
        let d = parse_decision(&value, &config(), &[]).unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.department, "Logistics");
        assert_eq!(d.justification, "late delivery");
    }

    #[test]
    fn test_parse_decision_invalid_severity_rejected() {
        let value = json!({"severity": "Catastrophic", "routed_department": "Ops"});
        assert!(parse_decision(&value, &config(), &[]).is_none());
    }

    #[test]
    fn test_parse_decision_missing_department_uses_map() {
        let value = json!({"severity": "Medium"});
        let categories = vec!["Delivery Problem".to_string()];
        let d = parse_decision(&value, &config(), &categories).unwrap();
        assert_eq!(d.department, "Logistics");
    }

    #[tokio::test]
    async fn test_route_offline_uses_fallback_marker() {
        let model = ModelClient::new(crate::config::LlmConfig {
            timeout_secs: 1,
            ..Default::default()
        });
        let (d, provenance) = route(
            &model,
            &config(),
            "the shipment is late",
            &["Delivery Problem".to_string()],
            Some(Sentiment::Neutral),
            &[],
        )
        .await;
        assert_eq!(d.severity, Severity::Medium);
        assert_eq!(provenance, FALLBACK_MARKER);
    }
}
