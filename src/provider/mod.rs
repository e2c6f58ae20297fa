//! Model-serving provider trait and implementations.

pub mod http;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::error::FinanceError;
use crate::models::LanguageModel;
use crate::types::{FinishReason, GenerationSettings, Message, ToolInvocationRequest, Usage};

pub use openai::OpenAiProvider;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A request sent to a model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Full context, system instruction first.
    pub messages: Vec<Message>,
    pub settings: GenerationSettings,
    pub tools: Vec<ToolDefinition>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub tool_calls: Vec<ToolInvocationRequest>,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// The assistant message this response represents.
    pub fn into_message(self) -> Message {
        Message::assistant_with_tool_calls(self.text, self.tool_calls)
    }
}

/// Core trait implemented by model-serving backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "groq", "openai").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate one assistant turn (non-streaming).
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, FinanceError>;
}

/// Create a provider for the given model, using the provided config.
pub fn create_provider(
    model: &LanguageModel,
    config: &AgentConfig,
) -> Result<Box<dyn ModelProvider>, FinanceError> {
    match model {
        LanguageModel::Groq(m) => {
            let api_key = config
                .get_api_key("groq")
                .ok_or_else(|| FinanceError::Authentication("Missing GROQ_API_KEY".into()))?;
            let base_url = config
                .get_base_url("groq")
                .unwrap_or_else(|| GROQ_BASE_URL.to_string());
            Ok(Box::new(OpenAiProvider::new("groq", m.as_str(), api_key, base_url)))
        }
        LanguageModel::OpenAi(id) => {
            let api_key = config
                .get_api_key("openai")
                .ok_or_else(|| FinanceError::Authentication("Missing OPENAI_API_KEY".into()))?;
            let base_url = config
                .get_base_url("openai")
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
            Ok(Box::new(OpenAiProvider::new("openai", id, api_key, base_url)))
        }
        LanguageModel::OpenAiCompatible(id) => {
            let api_key = config
                .get_api_key("openai-compatible")
                .or_else(|| config.get_api_key("openai"))
                .ok_or_else(|| {
                    FinanceError::Authentication("Missing OPENAI_COMPAT_API_KEY".into())
                })?;
            let base_url = config
                .get_base_url("openai-compatible")
                .ok_or_else(|| {
                    FinanceError::Configuration("Missing OPENAI_COMPAT_BASE_URL".into())
                })?;
            Ok(Box::new(OpenAiProvider::new("openai-compatible", id, api_key, base_url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroqModel;

    #[test]
    fn groq_requires_api_key() {
        let config = AgentConfig::default();
        let model = LanguageModel::Groq(GroqModel::Llama31_8bInstant);
        let err = match create_provider(&model, &config) {
            Ok(_) => panic!("expected missing key error"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn compatible_provider_needs_base_url() {
        let mut config = AgentConfig::default();
        config.set_api_key("openai-compatible", "k");
        let err = match create_provider(&LanguageModel::OpenAiCompatible("m".into()), &config) {
            Ok(_) => panic!("expected missing base url"),
            Err(err) => err,
        };
        assert!(matches!(err, FinanceError::Configuration(_)));

        config.set_base_url("openai-compatible", "http://localhost:8000/v1");
        let provider =
            create_provider(&LanguageModel::OpenAiCompatible("m".into()), &config).unwrap();
        assert_eq!(provider.provider_name(), "openai-compatible");
        assert_eq!(provider.model_id(), "m");
    }
}
