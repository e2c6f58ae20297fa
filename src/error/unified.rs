//! Error classification and the contained tool failure payload.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::FinanceError;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    ToolExecution,
    Decision,
    NonConvergence,
    Unknown,
}

/// Kind of a tool failure that was contained inside a tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolFailureKind {
    UnknownTool,
    InvalidArguments,
    ExecutionFailed,
    Timeout,
}

/// Structured error description placed in a tool result's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub tool: String,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolFailureKind, tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Map an error raised by a tool function into a contained failure.
    pub fn from_error(tool: &str, error: &FinanceError) -> Self {
        let kind = match error {
            FinanceError::UnknownTool(_) => ToolFailureKind::UnknownTool,
            FinanceError::InvalidArgument(_) => ToolFailureKind::InvalidArguments,
            FinanceError::Timeout(_) => ToolFailureKind::Timeout,
            _ => ToolFailureKind::ExecutionFailed,
        };
        let message = match error {
            FinanceError::SymbolNotFound(symbol) => {
                format!("lookup failed: no instrument found for symbol '{symbol}'")
            }
            FinanceError::EmptyResult { .. } => format!("lookup failed: {error}"),
            _ => error.to_string(),
        };
        Self::new(kind, tool, message)
    }

    /// JSON payload stored as tool result content.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind,
                "tool": self.tool,
                "message": self.message,
            }
        })
    }
}
