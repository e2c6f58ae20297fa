//! Model definitions and selection.

pub mod groq;
pub mod selector;

pub use groq::GroqModel;
pub use selector::ModelSelector;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default model: a small, fast Groq-hosted Llama with tool calling.
pub const DEFAULT_MODEL: &str = "groq:llama-3.1-8b-instant";

/// Language model backing the decision step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "provider", content = "model")]
pub enum LanguageModel {
    Groq(GroqModel),
    OpenAi(String),
    /// Any endpoint speaking the OpenAI Chat Completions protocol.
    OpenAiCompatible(String),
}

impl LanguageModel {
    /// Get the model's API identifier string.
    pub fn model_id(&self) -> &str {
        match self {
            Self::Groq(m) => m.as_str(),
            Self::OpenAi(id) | Self::OpenAiCompatible(id) => id,
        }
    }

    /// Get the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Groq(_) => "groq",
            Self::OpenAi(_) => "openai",
            Self::OpenAiCompatible(_) => "openai-compatible",
        }
    }
}

impl Default for LanguageModel {
    fn default() -> Self {
        Self::Groq(GroqModel::Llama31_8bInstant)
    }
}

impl fmt::Display for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_name(), self.model_id())
    }
}
