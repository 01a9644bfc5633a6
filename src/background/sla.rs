// src/background/sla.rs
// SLA monitor: periodic scan that flags overdue open complaints and emits
// exactly one alert per complaint

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::notify::Notifier;

/// Scans open complaints on a fixed interval until shutdown
pub struct SlaMonitor {
    db: Arc<Database>,
    config: Arc<Config>,
    notifier: Arc<dyn Notifier>,
    shutdown: watch::Receiver<bool>,
}

impl SlaMonitor {
    pub fn new(
        db: Arc<Database>,
        config: Arc<Config>,
        notifier: Arc<dyn Notifier>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            config,
            notifier,
            shutdown,
        }
    }

    /// Run until the shutdown signal flips. The scan itself never kills the
    /// loop; a store error aborts only that iteration.
    pub async fn run(mut self) {
        let interval = Duration::from_secs(self.config.sla_interval_secs);
        info!(interval_secs = interval.as_secs(), "SLA monitor started");

        loop {
            match self.check_once(Utc::now()).await {
                Ok(violations) => {
                    info!(violations, "SLA check completed");
                }
                Err(e) => {
                    warn!(error = %e, "SLA check failed; will retry next tick");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("SLA monitor shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// One scan pass at the given instant.
    ///
    /// A store error during the scan returns Ok(0) after logging: the
    /// monitor degrades to "no violations found this tick" instead of
    /// crashing the loop.
    pub async fn check_once(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let complaints = match self.db.unresolved_complaints() {
            Ok(complaints) => complaints,
            Err(e) => {
                warn!(error = %e, "Store error during SLA scan, aborting this pass");
                return Ok(0);
            }
        };

        let mut violations = 0usize;
        for complaint in complaints {
            let hours = self.config.sla_hours(complaint.severity);
            let due = complaint.created_at + ChronoDuration::hours(hours);
            if now <= due || complaint.sla_violation {
                continue;
            }

            // The flag write is the once-only guard; alert only on a fresh
            // false -> true transition
            match self.db.mark_sla_violation(complaint.id) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(id = complaint.id, error = %e, "Failed to flag SLA violation");
                    continue;
                }
            }
            violations += 1;
            warn!(id = complaint.id, severity = ?complaint.severity, "SLA violation detected");

            let to = self.config.admin_email.as_deref().unwrap_or_default();
            let subject = format!("SLA Violation for Ticket #{}", complaint.id);
            let body = format!(
                "Ticket {} assigned to {} is overdue. Severity={}.\nSubject: {}\nReceived: {}\nCreated: {}",
                complaint.id,
                complaint.department.as_deref().unwrap_or("General Support"),
                complaint
                    .severity
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unset".to_string()),
                complaint.subject.as_deref().unwrap_or("(no subject)"),
                complaint
                    .received_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                complaint.created_at.to_rfc3339(),
            );
            if !self.notifier.send(to, &subject, &body).await {
                warn!(id = complaint.id, "SLA alert delivery failed");
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{NewComplaint, Severity, Status};
    use crate::notify::test_support::RecordingNotifier;

    fn monitor(db: Arc<Database>, notifier: Arc<RecordingNotifier>) -> SlaMonitor {
        let (_tx, rx) = watch::channel(false);
        let config = Arc::new(Config {
            admin_email: Some("admin@example.com".to_string()),
            ..Config::default()
        });
        SlaMonitor::new(db, config, notifier, rx)
    }

    fn insert_aged(db: &Database, severity: Option<Severity>, age_hours: i64) -> i64 {
        let id = db
            .insert_complaint(&NewComplaint {
                customer_name: None,
                customer_email: None,
                channel: "Web".to_string(),
                subject: Some("aged ticket".to_string()),
                description: "aged ticket".to_string(),
            })
            .unwrap();
        if let Some(severity) = severity {
            db.set_severity(id, severity).unwrap();
        }
        db.set_created_at(id, Utc::now() - ChronoDuration::hours(age_hours))
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_urgent_overdue_is_flagged_low_is_not() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());

        // Both 13h old: Urgent threshold is 12h, Low is 168h
        let urgent = insert_aged(&db, Some(Severity::Urgent), 13);
        let low = insert_aged(&db, Some(Severity::Low), 13);

        let m = monitor(db.clone(), notifier.clone());
        let violations = m.check_once(Utc::now()).await.unwrap();
        assert_eq!(violations, 1);
        assert_eq!(notifier.count(), 1);

        assert!(db.get_complaint(urgent).unwrap().unwrap().sla_violation);
        assert!(!db.get_complaint(low).unwrap().unwrap().sla_violation);
    }

    #[tokio::test]
    async fn test_alert_fires_exactly_once_across_scans() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        insert_aged(&db, Some(Severity::High), 25);

        let m = monitor(db.clone(), notifier.clone());
        assert_eq!(m.check_once(Utc::now()).await.unwrap(), 1);
        assert_eq!(m.check_once(Utc::now()).await.unwrap(), 0);
        assert_eq!(m.check_once(Utc::now()).await.unwrap(), 0);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_violation_flag_is_never_cleared() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let id = insert_aged(&db, Some(Severity::Urgent), 13);

        let m = monitor(db.clone(), notifier.clone());
        m.check_once(Utc::now()).await.unwrap();
        m.check_once(Utc::now()).await.unwrap();
        assert!(db.get_complaint(id).unwrap().unwrap().sla_violation);
    }

    #[tokio::test]
    async fn test_resolved_complaints_are_skipped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let id = insert_aged(&db, Some(Severity::Urgent), 48);
        db.set_status(id, Status::Resolved).unwrap();

        let m = monitor(db.clone(), notifier.clone());
        assert_eq!(m.check_once(Utc::now()).await.unwrap(), 0);
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_unset_severity_uses_default_threshold() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());

        // Default threshold is 72h: 50h old is on time, 73h old is overdue
        insert_aged(&db, None, 50);
        insert_aged(&db, None, 73);

        let m = monitor(db.clone(), notifier.clone());
        assert_eq!(m.check_once(Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exactly_due_is_not_violated() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let id = insert_aged(&db, Some(Severity::Urgent), 12);

        let m = monitor(db.clone(), notifier.clone());
        // now == due (within timing slop the fixture sits right at the
        // boundary); use the stored created_at to compute an exact "now"
        let created = db.get_complaint(id).unwrap().unwrap().created_at;
        let exactly_due = created + ChronoDuration::hours(12);
        assert_eq!(m.check_once(exactly_due).await.unwrap(), 0);
    }
}
