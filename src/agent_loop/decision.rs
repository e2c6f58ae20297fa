//! Decision step: one model call over the transcript.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FinanceError, Result};
use crate::provider::{ModelProvider, ProviderRequest, ToolDefinition};
use crate::types::{FinishReason, GenerationSettings, Message, Usage};
use crate::util::timeout::with_optional_timeout;

/// Instruction placed ahead of the transcript on every decision.
pub const SYSTEM_PROMPT: &str = r#"You are a highly intelligent and reliable **Finance Research Assistant Agent** designed to provide accurate, up-to-date, and insightful financial data. Your primary role is to retrieve, analyze, and present information on publicly traded companies, including their financial metrics, market trends, institutional and mutual fund holdings, stock upgrades/downgrades, stock splits, and news.

Your responses must be:
- **Accurate & Factual:** Ensure all data is retrieved correctly from reliable sources. Avoid speculation or assumptions.
- **Clear & Concise:** Present information in a well-structured manner, avoiding unnecessary complexity.
- **Objective & Neutral:** Report financial data without bias or subjective opinions.
- **Context-Aware:** Understand user queries and provide the most relevant insights based on available data.

If a user requests information beyond your capabilities, respond with transparency and suggest alternative approaches where applicable. You are a trusted research tool, not a financial advisor, and should refrain from making investment recommendations or predictions."#;

/// Outcome of one decision: exactly one assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub message: Message,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

impl Decision {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: Usage::default(),
            finish_reason: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// Produces the next assistant message for a transcript.
///
/// Failures are always [`FinanceError::DecisionUnavailable`] and end the turn.
#[async_trait]
pub trait DecisionStep: Send + Sync {
    async fn decide(&self, transcript: &[Message]) -> Result<Decision>;
}

/// Decision step backed by a model provider.
pub struct ModelDecisionStep {
    provider: Arc<dyn ModelProvider>,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    settings: GenerationSettings,
    timeout: Option<Duration>,
}

impl ModelDecisionStep {
    pub fn new(provider: Arc<dyn ModelProvider>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            provider,
            system_prompt: SYSTEM_PROMPT.to_string(),
            tools,
            settings: GenerationSettings::default(),
            timeout: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, transcript: &[Message]) -> ProviderRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        // A stored system message would duplicate the instruction.
        messages.extend(
            transcript
                .iter()
                .filter(|m| !matches!(m, Message::System { .. }))
                .cloned(),
        );
        ProviderRequest {
            messages,
            settings: self.settings.clone(),
            tools: self.tools.clone(),
        }
    }
}

#[async_trait]
impl DecisionStep for ModelDecisionStep {
    async fn decide(&self, transcript: &[Message]) -> Result<Decision> {
        let request = self.build_request(transcript);
        debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_id(),
            messages = request.messages.len(),
            "requesting decision"
        );
        let response = with_optional_timeout(self.timeout, self.provider.generate(&request))
            .await
            .map_err(FinanceError::decision_unavailable)?;

        let usage = response.usage;
        let finish_reason = response.finish_reason;
        Ok(Decision {
            message: response.into_message(),
            usage,
            finish_reason,
        })
    }
}

impl std::fmt::Debug for ModelDecisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDecisionStep")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .field("tools", &self.tools.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderResponse;
    use crate::types::ToolInvocationRequest;
    use std::sync::Mutex;

    struct RecordingProvider {
        seen: Mutex<Vec<ProviderRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl ModelProvider for RecordingProvider {
        fn provider_name(&self) -> &str {
            "test"
        }
        fn model_id(&self) -> &str {
            "recorder"
        }
        async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(FinanceError::api(503, "overloaded"));
            }
            Ok(ProviderResponse {
                text: String::new(),
                tool_calls: vec![ToolInvocationRequest::new(
                    "call_1",
                    "stock_news_retriever",
                    serde_json::json!({ "ticker": "AAPL" }),
                )],
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 2,
                    total_tokens: 12,
                },
                finish_reason: Some(FinishReason::ToolCalls),
            })
        }
    }

    fn provider(fail: bool) -> Arc<RecordingProvider> {
        Arc::new(RecordingProvider {
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[tokio::test]
    async fn system_prompt_is_prepended_but_not_returned() {
        let backend = provider(false);
        let step = ModelDecisionStep::new(backend.clone(), Vec::new());
        let transcript = vec![Message::assistant("Hey"), Message::user("News for AAPL?")];

        let decision = step.decide(&transcript).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 3);
        assert_eq!(seen[0].messages[0], Message::system(SYSTEM_PROMPT));
        assert_eq!(decision.message.tool_calls().len(), 1);
        assert_eq!(decision.usage.total_tokens, 12);
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn stored_system_messages_are_not_sent_twice() {
        let backend = provider(false);
        let step =
            ModelDecisionStep::new(backend.clone(), Vec::new()).with_system_prompt("be brief");
        step.decide(&[Message::system("old"), Message::user("hi")]).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        let systems = seen[0]
            .messages
            .iter()
            .filter(|m| matches!(m, Message::System { .. }))
            .count();
        assert_eq!(systems, 1);
        assert_eq!(seen[0].messages[0].text(), "be brief");
    }

    #[tokio::test]
    async fn backend_failure_is_decision_unavailable() {
        let step = ModelDecisionStep::new(provider(true), Vec::new());
        let err = step.decide(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, FinanceError::DecisionUnavailable { .. }));
        assert!(err.to_string().contains("overloaded"));
    }

    struct StalledProvider;

    #[async_trait]
    impl ModelProvider for StalledProvider {
        fn provider_name(&self) -> &str {
            "test"
        }
        fn model_id(&self) -> &str {
            "stalled"
        }
        async fn generate(&self, _request: &ProviderRequest) -> Result<ProviderResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ProviderResponse {
                text: "too late".into(),
                tool_calls: Vec::new(),
                usage: Usage::default(),
                finish_reason: Some(FinishReason::Stop),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn decision_deadline_is_decision_unavailable() {
        let step = ModelDecisionStep::new(Arc::new(StalledProvider), Vec::new())
            .with_timeout(Some(Duration::from_millis(10)));

        let err = step.decide(&[Message::user("hi")]).await.unwrap_err();

        match err {
            FinanceError::DecisionUnavailable { source, .. } => {
                assert!(matches!(source.as_deref(), Some(FinanceError::Timeout(10))));
            }
            other => panic!("expected DecisionUnavailable, got {other:?}"),
        }
    }
}
