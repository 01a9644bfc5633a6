// src/config/mod.rs
// Environment-based configuration - single source of truth for all env vars

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::db::types::Severity;

/// Default chat-completion endpoints
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_GITHUB_MODELS_URL: &str = "https://models.github.ai/inference/chat/completions";
const DEFAULT_GITHUB_API_VERSION: &str = "2022-11-28";
const DEFAULT_MODEL: &str = "github/gpt-4o-mini";

/// Default request timeout for model calls (seconds)
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 20;

/// Default interval between SLA scans (seconds)
const DEFAULT_SLA_INTERVAL_SECS: u64 = 300;

/// Model provider credentials and endpoints
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// GitHub Models token (GITHUB_TOKEN); takes priority when set
    pub github_token: Option<String>,
    /// GitHub Models endpoint (GITHUB_MODELS_URL)
    pub github_url: String,
    /// X-GitHub-Api-Version header value (GITHUB_API_VERSION)
    pub github_api_version: String,
    /// Generic bearer token (LLM_API_KEY or OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// OpenAI-style endpoint (LLM_API_URL)
    pub api_url: String,
    /// Model name (LLM_MODEL)
    pub model: String,
    /// Request timeout in seconds (LLM_TIMEOUT)
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Check if any credential is configured
    pub fn has_credentials(&self) -> bool {
        self.github_token.is_some() || self.api_key.is_some()
    }
}

/// Service configuration loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    /// SQLite database path (TRIAGE_DB_PATH)
    pub db_path: String,

    /// Seconds between SLA monitor scans (SLA_CHECK_INTERVAL)
    pub sla_interval_secs: u64,

    /// Recipient for SLA violation alerts (ADMIN_EMAIL)
    pub admin_email: Option<String>,

    /// HTTP listen port (TRIAGE_PORT)
    pub port: u16,

    /// Category label -> routing department
    pub department_map: HashMap<String, String>,

    /// Severity -> SLA deadline in hours
    pub sla_thresholds: HashMap<Severity, i64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let github_token = read_var("GITHUB_TOKEN");
        let api_key = read_var("LLM_API_KEY").or_else(|| read_var("OPENAI_API_KEY"));

        let llm = LlmConfig {
            github_token,
            github_url: read_var("GITHUB_MODELS_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_MODELS_URL.to_string()),
            github_api_version: read_var("GITHUB_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_VERSION.to_string()),
            api_key,
            api_url: read_var("LLM_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            model: read_var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: read_parsed("LLM_TIMEOUT", DEFAULT_LLM_TIMEOUT_SECS),
        };

        if llm.has_credentials() {
            debug!(model = %llm.model, "Model credentials loaded");
        } else {
            warn!("No model credentials configured - classification will use local heuristics");
        }

        Self {
            llm,
            db_path: read_var("TRIAGE_DB_PATH").unwrap_or_else(|| "./complaints.db".to_string()),
            sla_interval_secs: read_parsed("SLA_CHECK_INTERVAL", DEFAULT_SLA_INTERVAL_SECS),
            admin_email: read_var("ADMIN_EMAIL"),
            port: read_parsed("TRIAGE_PORT", 8080),
            department_map: default_department_map(),
            sla_thresholds: default_sla_thresholds(),
        }
    }

    /// Department for a category label; "General Support" when unmapped
    pub fn department_for(&self, category: &str) -> String {
        self.department_map
            .get(category)
            .cloned()
            .unwrap_or_else(|| "General Support".to_string())
    }

    /// SLA deadline in hours for a severity; 72h when unset
    pub fn sla_hours(&self, severity: Option<Severity>) -> i64 {
        severity
            .and_then(|s| self.sla_thresholds.get(&s).copied())
            .unwrap_or(72)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                github_token: None,
                github_url: DEFAULT_GITHUB_MODELS_URL.to_string(),
                github_api_version: DEFAULT_GITHUB_API_VERSION.to_string(),
                api_key: None,
                api_url: DEFAULT_OPENAI_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            },
            db_path: "./complaints.db".to_string(),
            sla_interval_secs: DEFAULT_SLA_INTERVAL_SECS,
            admin_email: None,
            port: 8080,
            department_map: default_department_map(),
            sla_thresholds: default_sla_thresholds(),
        }
    }
}

/// Read an env var, filtering empty values
fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an env var, falling back to a default
fn read_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    read_var(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn default_department_map() -> HashMap<String, String> {
    [
        ("Billing Issue", "Accounts"),
        ("Product Defect", "Product Engineering"),
        ("Refund Request", "Finance"),
        ("Technical Issue", "Technical Support"),
        ("Delivery Problem", "Logistics"),
        ("Service Quality", "Customer Experience"),
        ("Others", "General Support"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_sla_thresholds() -> HashMap<Severity, i64> {
    [
        (Severity::Urgent, 12),
        (Severity::High, 24),
        (Severity::Medium, 72),
        (Severity::Low, 168),
    ]
    .into_iter()
    .collect()
}
