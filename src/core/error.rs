//! Custom error types for Planwise
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Planwise operations
#[derive(Error, Debug)]
pub enum PlanwiseError {
    /// Completion provider returned something unusable
    #[error("LLM error: {0}")]
    Llm(String),

    /// Completion provider answered with a non-success HTTP status
    #[error("LLM provider returned HTTP {status}: {message}")]
    LlmStatus { status: u16, message: String },

    /// Planner output could not be extracted or parsed as a plan
    #[error("Plan parse error: {message}")]
    PlanParse { message: String, raw: String },

    /// Re-planning gave up after repeated parse failures
    #[error("Plan update failed after {attempts} attempt(s): {last_error}")]
    PlanUpdateFailed { attempts: usize, last_error: String },

    /// Task folder could not be provisioned
    #[error("Task folder error: {0}")]
    TaskFolder(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Planwise operations
pub type Result<T> = std::result::Result<T, PlanwiseError>;

impl PlanwiseError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a plan parse error, keeping the offending text around
    pub fn plan_parse(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::PlanParse {
            message: msg.into(),
            raw: raw.into(),
        }
    }

    /// Whether retrying the same completion request might succeed.
    ///
    /// Connection failures, timeouts, rate limits and 5xx answers qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::LlmStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
