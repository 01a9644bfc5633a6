// src/notify.rs
// Outbound alert seam. The monitor only needs send(); delivery transport
// lives behind this trait and failures are reported, never raised.

use async_trait::async_trait;
use tracing::{info, warn};

/// Notification sender consumed by the SLA monitor
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message; false means delivery failed
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// Default implementation: structured log lines instead of a mail transport
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        info!(to, subject, body, "Notification (log transport)");
        true
    }
}

/// Drops every message; used when no alert recipient is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _to: &str, subject: &str, _body: &str) -> bool {
        warn!(subject, "No alert recipient configured, dropping notification");
        false
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_reports_delivered() {
        assert!(LogNotifier.send("admin@example.com", "subject", "body").await);
    }

    #[tokio::test]
    async fn test_null_notifier_reports_undelivered() {
        assert!(!NullNotifier.send("", "subject", "body").await);
    }
}
