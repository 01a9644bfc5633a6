// src/llm/client.rs
// Resilient chat-completion client: auth-scheme selection, bounded retry
// with backoff, global rate-limit cooldown, unknown-model recovery.

use chrono::Duration as ChronoDuration;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{error, info, warn};

use super::cooldown::{Clock, CooldownGate, SystemClock};
use crate::config::LlmConfig;

/// Retry attempts for transport failures
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base backoff between transport retries (doubles each attempt)
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Connect timeout for all requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Cooldown applied after a 429 with no parsable wait hint
const DEFAULT_COOLDOWN_SECS: u64 = 3600;

/// "Please wait 71085 seconds" style hints in rate-limit bodies
static WAIT_SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3,6})\s*seconds").expect("static regex"));

/// Result of one model invocation. Every failure class collapses to
/// Unavailable at this boundary; callers route to their fallback, they
/// never see an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    Success(String),
    Unavailable,
}

impl ModelOutcome {
    pub fn text(self) -> Option<String> {
        match self {
            Self::Success(text) => Some(text),
            Self::Unavailable => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Internal failure classification; used for logging and cooldown
/// decisions only, never surfaced past invoke()
#[derive(Debug)]
enum CallFailure {
    AuthRejected,
    RateLimited(u64),
    ModelNotFound,
    Transport(String),
    BadStatus(u16, String),
}

/// Resolved endpoint + auth scheme for one call
struct Endpoint {
    url: String,
    token: String,
    github: bool,
}

/// Chat-completion client shared across the pipeline. Clones share the
/// HTTP connection pool and the cooldown gate.
#[derive(Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    config: LlmConfig,
    cooldown: CooldownGate,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    base_backoff: Duration,
}

impl ModelClient {
    pub fn new(config: LlmConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LlmConfig, clock: Arc<dyn Clock>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            config,
            cooldown: CooldownGate::new(),
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    /// Invoke the chat-completion API.
    ///
    /// Returns Unavailable for every failure class: missing credentials,
    /// active cooldown, auth rejection, rate limit, unknown model after the
    /// variant sweep, or exhausted transport retries.
    pub async fn invoke(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f64,
        max_tokens: u32,
    ) -> ModelOutcome {
        let Some(endpoint) = self.select_endpoint() else {
            warn!("No model credentials configured; falling back to local heuristics");
            return ModelOutcome::Unavailable;
        };

        if let Some(until) = self.cooldown.active_until(self.clock.now()) {
            warn!(until = %until, "Model cooldown active, skipping call");
            return ModelOutcome::Unavailable;
        }

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        match self.send_with_retry(&endpoint, payload).await {
            Ok(body) => ModelOutcome::Success(extract_content(body)),
            Err(failure) => {
                match &failure {
                    CallFailure::AuthRejected => {}
                    CallFailure::RateLimited(secs) => {
                        error!(retry_after_secs = secs, "Model rate limit reached, cooldown engaged");
                    }
                    CallFailure::ModelNotFound => {
                        error!(
                            model = %self.config.model,
                            "All model name variants failed; set LLM_MODEL to a valid model for your provider"
                        );
                    }
                    CallFailure::Transport(e) => {
                        error!(error = %e, "Model call failed after transport retries");
                    }
                    CallFailure::BadStatus(status, body) => {
                        error!(status, body = %body, "Model HTTP error");
                    }
                }
                ModelOutcome::Unavailable
            }
        }
    }

    /// Pick endpoint + header scheme from configured credentials.
    /// GitHub token wins when both are set; None means no credential at all.
    fn select_endpoint(&self) -> Option<Endpoint> {
        if let Some(token) = &self.config.github_token {
            return Some(Endpoint {
                url: self.config.github_url.clone(),
                token: token.clone(),
                github: true,
            });
        }
        self.config.api_key.as_ref().map(|key| Endpoint {
            url: self.config.api_url.clone(),
            token: key.clone(),
            github: false,
        })
    }

    fn build_request(&self, endpoint: &Endpoint, payload: &Value) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(&endpoint.url)
            .header("Authorization", format!("Bearer {}", endpoint.token))
            .header("Content-Type", "application/json");
        if endpoint.github {
            req = req
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", &self.config.github_api_version);
        }
        req.json(payload)
    }

    /// Transport failures are retried with exponential backoff; HTTP error
    /// statuses are classified once and never retried here.
    async fn send_with_retry(
        &self,
        endpoint: &Endpoint,
        payload: Value,
    ) -> Result<Value, CallFailure> {
        let mut attempt = 0;
        let mut backoff = self.base_backoff;

        loop {
            attempt += 1;
            let response = match self.build_request(endpoint, &payload).send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.max_attempts {
                        return Err(CallFailure::Transport(e.to_string()));
                    }
                    warn!(attempt, error = %e, "Model request failed, retrying in {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| CallFailure::Transport(e.to_string()));
            }

            let retry_after_header = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                401 => {
                    self.log_auth_rejection(endpoint, &body);
                    Err(CallFailure::AuthRejected)
                }
                429 => {
                    let secs = retry_after_secs(retry_after_header.as_deref(), &body);
                    let until = self.clock.now() + ChronoDuration::seconds(secs as i64);
                    self.cooldown.engage(until);
                    Err(CallFailure::RateLimited(secs))
                }
                404 if body.to_lowercase().contains("unknown_model") => {
                    warn!(body = %body, "Unknown model, attempting model-name fallbacks");
                    self.try_model_variants(endpoint, payload).await
                }
                code => Err(CallFailure::BadStatus(code, body)),
            };
        }
    }

    /// Sweep a short ordered list of alternate model names against the same
    /// endpoint; first success wins.
    async fn try_model_variants(
        &self,
        endpoint: &Endpoint,
        mut payload: Value,
    ) -> Result<Value, CallFailure> {
        for variant in model_variants(&self.config.model) {
            info!(model = %variant, "Retrying model request with variant");
            payload["model"] = json!(variant);

            let response = match self.build_request(endpoint, &payload).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(model = %variant, error = %e, "Model variant failed");
                    continue;
                }
            };
            if !response.status().is_success() {
                warn!(model = %variant, status = %response.status(), "Model variant rejected");
                continue;
            }
            match response.json::<Value>().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(model = %variant, error = %e, "Model variant returned unreadable body");
                    continue;
                }
            }
        }
        Err(CallFailure::ModelNotFound)
    }

    /// 401 diagnostics: the usual cause is a token from one provider pointed
    /// at the other provider's URL (endpoint overridden via env).
    fn log_auth_rejection(&self, endpoint: &Endpoint, body: &str) {
        let looks_github = endpoint.token.starts_with("ghp_")
            || endpoint.token.starts_with("github_pat_");
        let looks_openai = endpoint.token.starts_with("sk-");
        let url = &endpoint.url;

        if looks_github && url.contains("openai") {
            error!(
                body = %body,
                "401 Unauthorized: GitHub token sent to an OpenAI-style URL; set GITHUB_MODELS_URL or LLM_API_URL to match the credential"
            );
        } else if looks_openai && url.contains("github") {
            error!(
                body = %body,
                "401 Unauthorized: OpenAI key sent to a GitHub Models URL; use GITHUB_TOKEN for GitHub Models or LLM_API_KEY for OpenAI"
            );
        } else {
            error!(body = %body, "Model call failed: 401 Unauthorized");
        }
    }
}

/// Cooldown duration after a 429: Retry-After header, then a "wait N
/// seconds" hint in the body, then a conservative default.
fn retry_after_secs(header: Option<&str>, body: &str) -> u64 {
    if let Some(value) = header
        && let Ok(secs) = value.trim().parse::<u64>()
    {
        return secs;
    }
    if let Some(caps) = WAIT_SECONDS_RE.captures(body)
        && let Ok(secs) = caps[1].parse::<u64>()
    {
        return secs;
    }
    DEFAULT_COOLDOWN_SECS
}

/// Alternate model names to try after an unknown-model 404: strip/add the
/// provider prefix, then the canonical fallback. The original name is
/// excluded since it already failed.
fn model_variants(model: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if let Some(name) = model.strip_prefix("github/") {
        variants.push(name.to_string());
        variants.push(format!("openai/{name}"));
    } else if let Some(name) = model.strip_prefix("openai/") {
        variants.push(name.to_string());
    } else {
        variants.push(format!("openai/{model}"));
        variants.push("gpt-4o-mini".to_string());
    }
    variants.retain(|v| !v.is_empty() && v != model);
    variants.dedup();
    variants
}

/// Extract assistant text from a completion response. Falls through the
/// known shapes and finally serializes the whole body; a response is never
/// discarded silently.
fn extract_content(body: Value) -> String {
    if let Some(content) = body["choices"][0]["message"]["content"].as_str() {
        return content.to_string();
    }
    if let Some(content) = body["choices"][0]["content"].as_str() {
        return content.to_string();
    }
    if let Some(text) = body["text"].as_str() {
        return text.to_string();
    }
    body.to_string()
}
