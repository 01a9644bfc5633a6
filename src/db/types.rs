// src/db/types.rs
// Typed domain model over the complaints table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal urgency label driving the SLA deadline.
///
/// Variant order matters: `Ord` gives Low < Medium < High < Urgent, which
/// the routing fallback relies on for its monotonic escalation merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Urgent,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }

    /// Parse from a stored or model-produced label (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment label attached by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complaint lifecycle state; transitions are driven by API callers,
/// never by the pipeline or the SLA monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    New,
    Acknowledged,
    InProgress,
    Resolved,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Acknowledged => "Acknowledged",
            Self::InProgress => "InProgress",
            Self::Resolved => "Resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(Self::New),
            "acknowledged" => Some(Self::Acknowledged),
            "inprogress" | "in progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored complaint. Derived fields are None until the pipeline has run.
#[derive(Debug, Clone, Serialize)]
pub struct Complaint {
    pub id: i64,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub channel: String,
    pub subject: Option<String>,
    pub description: String,

    // Derived by the pipeline
    pub categories: Vec<String>,
    pub sentiment: Option<Sentiment>,
    pub severity: Option<Severity>,
    pub department: Option<String>,
    pub keywords: Vec<String>,

    // Raw model output (or fallback marker) for audit
    pub llm_classification: Option<String>,
    pub llm_routing: Option<String>,

    // Lifecycle
    pub status: String,
    pub sla_violation: bool,
    pub received_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Complaint {
    pub fn is_resolved(&self) -> bool {
        Status::parse(&self.status) == Some(Status::Resolved)
    }
}

/// Raw fields for a complaint being created (API or test harness)
#[derive(Debug, Clone, Deserialize)]
pub struct NewComplaint {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
    pub subject: Option<String>,
    pub description: String,
}

fn default_channel() -> String {
    "Web".to_string()
}

/// Pipeline output summary returned to API callers
#[derive(Debug, Clone, Serialize)]
pub struct TriageSummary {
    pub id: i64,
    pub categories: Vec<String>,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub severity: Severity,
    pub department: String,
}
