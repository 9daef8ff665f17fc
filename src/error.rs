// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction failed in {agent}: {message}")]
    ExtractionFailure { agent: String, message: String },

    #[error("Aggregation failed: {0}")]
    AggregationFailure(String),

    #[error("Formatting failed: {0}")]
    FormattingFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Indexing error: {0}")]
    Indexing(String),

    #[error("Model request failed: {0}")]
    Model(String),

    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout { operation: String, after: Duration },

    #[error("Task cancelled")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub fn extraction(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_message() {
        let err = AnalysisError::extraction("scoring_analyzer", "model unavailable");
        assert_eq!(
            err.to_string(),
            "Extraction failed in scoring_analyzer: model unavailable"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = AnalysisError::Timeout {
            operation: "complete".to_string(),
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "complete timed out after 1.5s");
    }
}
