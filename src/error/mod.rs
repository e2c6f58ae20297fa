//! Error types for the finance agent.

pub mod unified;

pub use unified::{ErrorCategory, ToolFailure, ToolFailureKind};

use thiserror::Error;

/// Primary error type for all finance agent operations.
#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No {dataset} data available for {ticker}")]
    EmptyResult { ticker: String, dataset: String },

    #[error("Data provider error: {0}")]
    DataProvider(String),

    #[error("Decision backend unavailable: {message}")]
    DecisionUnavailable {
        message: String,
        #[source]
        source: Option<Box<FinanceError>>,
    },

    #[error("Assistant did not converge after {max_iterations} tool rounds")]
    NonConvergence { max_iterations: usize },
}

impl FinanceError {
    /// Create an API error from a status code and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Wrap a model-serving failure as a fatal decision error.
    pub fn decision_unavailable(source: FinanceError) -> Self {
        match source {
            already @ Self::DecisionUnavailable { .. } => already,
            other => Self::DecisionUnavailable {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::ModelNotFound(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::DuplicateTool(_)
            | Self::UnknownTool(_)
            | Self::InvalidArgument(_)
            | Self::SymbolNotFound(_)
            | Self::EmptyResult { .. }
            | Self::DataProvider(_) => ErrorCategory::ToolExecution,
            Self::DecisionUnavailable { .. } => ErrorCategory::Decision,
            Self::NonConvergence { .. } => ErrorCategory::NonConvergence,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DecisionUnavailable {
                source: Some(inner),
                ..
            } => inner.is_retryable(),
            _ => matches!(
                self.category(),
                ErrorCategory::RateLimit
                    | ErrorCategory::Network
                    | ErrorCategory::Timeout
                    | ErrorCategory::Server
            ),
        }
    }

    /// Message the calling layer shows when a turn fails outright.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NonConvergence { .. } => {
                "The assistant could not complete the request. Try rephrasing or narrowing the question."
            }
            _ => "Something went wrong, please try again.",
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FinanceError>;
