//! Model selector parsing.

use std::str::FromStr;

use super::{GroqModel, LanguageModel};
use crate::error::FinanceError;

/// Parse a "provider:model" string into a LanguageModel.
pub struct ModelSelector;

impl ModelSelector {
    /// Parse "provider:model_id" into a LanguageModel.
    ///
    /// Examples: "groq:llama-3.1-8b-instant", "openai:gpt-4o-mini",
    /// "openai-compatible:qwen2.5:7b"
    pub fn parse(s: &str) -> Result<LanguageModel, FinanceError> {
        let (provider, model_id) = s.split_once(':').ok_or_else(|| {
            FinanceError::InvalidArgument(format!(
                "Invalid model selector '{s}': expected 'provider:model_id'"
            ))
        })?;
        if model_id.is_empty() {
            return Err(FinanceError::InvalidArgument(format!(
                "Invalid model selector '{s}': empty model id"
            )));
        }

        match provider {
            "groq" => {
                let m = GroqModel::from_str(model_id)
                    .unwrap_or_else(|_| GroqModel::Custom(model_id.to_string()));
                Ok(LanguageModel::Groq(m))
            }
            "openai" => Ok(LanguageModel::OpenAi(model_id.to_string())),
            "openai-compatible" | "openai_compatible" | "compat" => {
                Ok(LanguageModel::OpenAiCompatible(model_id.to_string()))
            }
            other => Err(FinanceError::ModelNotFound(format!(
                "Unknown provider '{other}' in '{s}' (expected groq, openai or openai-compatible)"
            ))),
        }
    }
}

impl FromStr for LanguageModel {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelSelector::parse(s)
    }
}
