// src/pipeline/mod.rs
// Pipeline orchestrator: classify -> sentiment -> keywords -> route, then
// persist every derived field in one update

pub mod classifier;
pub mod keywords;
pub mod routing;
pub mod sentiment;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{Database, TriageUpdate, types::TriageSummary};
use crate::error::Result;
use crate::llm::ModelClient;

/// Runs the full triage pass for one complaint
#[derive(Clone)]
pub struct Pipeline {
    db: Arc<Database>,
    model: ModelClient,
    config: Arc<Config>,
}

impl Pipeline {
    pub fn new(db: Arc<Database>, model: ModelClient, config: Arc<Config>) -> Self {
        Self { db, model, config }
    }

    /// Process a complaint end to end.
    ///
    /// Returns Ok(None) when the id does not exist; that is an ordinary
    /// outcome, not an error. All derived fields plus both provenance
    /// payloads are written by a single update.
    pub async fn process(&self, id: i64) -> Result<Option<TriageSummary>> {
        let Some(complaint) = self.db.get_complaint(id)? else {
            warn!(id, "process called for unknown complaint");
            return Ok(None);
        };

        let (classification, llm_classification) =
            classifier::classify(&self.model, &complaint.description).await;

        let sentiment = sentiment::analyze(&self.model, &complaint.description).await;

        let keywords = keywords::extract_keywords(&complaint.description, keywords::DEFAULT_TOP_N);

        let (decision, llm_routing) = routing::route(
            &self.model,
            &self.config,
            &complaint.description,
            &classification.categories,
            Some(sentiment),
            &keywords,
        )
        .await;

        let update = TriageUpdate {
            categories: classification.categories.clone(),
            sentiment,
            severity: decision.severity,
            department: decision.department.clone(),
            keywords,
            llm_classification,
            llm_routing,
        };
        self.db.apply_triage(id, &update)?;

        info!(
            id,
            categories = ?classification.categories,
            severity = %decision.severity,
            department = %decision.department,
            "Processed complaint"
        );

        Ok(Some(TriageSummary {
            id,
            categories: classification.categories,
            confidence: classification.confidence,
            sentiment,
            severity: decision.severity,
            department: decision.department,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{NewComplaint, Severity};

    /// Pipeline wired with an in-memory store and no model credentials, so
    /// every stage exercises its deterministic fallback.
    fn offline_pipeline() -> (Arc<Database>, Pipeline) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = Arc::new(Config::default());
        let model = ModelClient::new(config.llm.clone());
        let pipeline = Pipeline::new(db.clone(), model, config);
        (db, pipeline)
    }

    fn complaint(description: &str) -> NewComplaint {
        NewComplaint {
            customer_name: Some("Test".to_string()),
            customer_email: None,
            channel: "Web".to_string(),
            subject: None,
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_missing_id_is_none() {
        let (_db, pipeline) = offline_pipeline();
        assert!(pipeline.process(4242).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_process_defect_scenario() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint(
                "My washing machine stopped working after two days. It's making a loud noise and won't spin.",
            ))
            .unwrap();

        let summary = pipeline.process(id).await.unwrap().expect("summary");
        assert!(summary.categories.contains(&"Product Defect".to_string()));
        assert_eq!(summary.severity, Severity::High);
        assert_eq!(summary.department, "Product Engineering");

        // Derived fields landed together
        let stored = db.get_complaint(id).unwrap().unwrap();
        assert_eq!(stored.severity, Some(Severity::High));
        assert_eq!(stored.department.as_deref(), Some("Product Engineering"));
        assert!(!stored.keywords.is_empty());
        assert!(stored.llm_classification.is_some());
        assert!(stored.llm_routing.is_some());
    }

    #[tokio::test]
    async fn test_process_billing_scenario() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint(
                "I was charged twice for my subscription. Please refund the extra charge.",
            ))
            .unwrap();

        let summary = pipeline.process(id).await.unwrap().unwrap();
        assert!(summary.categories.contains(&"Billing Issue".to_string()));
        assert!(summary.categories.contains(&"Refund Request".to_string()));
        assert!(summary.severity >= Severity::High);
    }

    #[tokio::test]
    async fn test_process_delivery_scenario() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint(
                "My package was supposed to arrive last week and it's still not here.",
            ))
            .unwrap();

        let summary = pipeline.process(id).await.unwrap().unwrap();
        assert!(summary.categories.contains(&"Delivery Problem".to_string()));
        assert_eq!(summary.severity, Severity::Medium);
        assert_eq!(summary.department, "Logistics");
    }

    #[tokio::test]
    async fn test_process_urgent_term_in_text() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint("I need a replacement urgently, ASAP."))
            .unwrap();

        let summary = pipeline.process(id).await.unwrap().unwrap();
        assert_eq!(summary.severity, Severity::Urgent);
    }

    #[tokio::test]
    async fn test_process_categories_never_empty() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint("I would like to update my postal address."))
            .unwrap();

        let summary = pipeline.process(id).await.unwrap().unwrap();
        assert_eq!(summary.categories, vec!["Others".to_string()]);
        assert_eq!(summary.department, "General Support");
    }

    #[tokio::test]
    async fn test_process_is_repeatable() {
        let (db, pipeline) = offline_pipeline();
        let id = db
            .insert_complaint(&complaint("The app crashes on login with error code 500."))
            .unwrap();

        let first = pipeline.process(id).await.unwrap().unwrap();
        let second = pipeline.process(id).await.unwrap().unwrap();
        assert_eq!(first.categories, second.categories);
        assert_eq!(first.severity, second.severity);
        assert_eq!(first.sentiment, second.sentiment);
    }
}
