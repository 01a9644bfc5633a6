// src/error.rs
// Standardized error types for the triage service

use thiserror::Error;

/// Main error type for the triage library
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("complaint not found: {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model error: {0}")]
    Model(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using TriageError
pub type Result<T> = std::result::Result<T, TriageError>;

impl From<String> for TriageError {
    fn from(s: String) -> Self {
        TriageError::Other(s)
    }
}

impl From<tokio::task::JoinError> for TriageError {
    fn from(err: tokio::task::JoinError) -> Self {
        TriageError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = TriageError::InvalidInput("empty description".to_string());
        assert!(err.to_string().contains("invalid input"));
        assert!(err.to_string().contains("empty description"));
    }

    #[test]
    fn test_not_found_error() {
        let err = TriageError::NotFound(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_model_error() {
        let err = TriageError::Model("rate limited".to_string());
        assert!(err.to_string().contains("model error"));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_from_string() {
        let err: TriageError = "boom".to_string().into();
        assert!(matches!(err, TriageError::Other(_)));
    }
}
