//! OpenAI Chat Completions provider.
//!
//! Groq and other OpenAI-compatible endpoints speak the same wire format, so
//! one implementation serves all of them with a different base URL.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::FinanceError;
use crate::types::*;

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

pub struct OpenAiProvider {
    provider: String,
    model_id: String,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        provider: impl Into<String>,
        model_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model_id: model_id.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let messages = request.messages.iter().map(message_to_openai).collect::<Vec<_>>();

        let mut body = serde_json::json!({
            "model": self.model_id,
            "messages": messages,
        });

        if let Some(obj) = body.as_object_mut() {
            let settings = &request.settings;
            if let Some(max) = settings.max_tokens {
                obj.insert("max_tokens".into(), max.into());
            }
            if let Some(temp) = settings.temperature {
                obj.insert("temperature".into(), temp.into());
            }
            if let Some(top_p) = settings.top_p {
                obj.insert("top_p".into(), top_p.into());
            }
            if let Some(seed) = settings.seed {
                obj.insert("seed".into(), seed.into());
            }

            if !request.tools.is_empty() {
                let tool_defs: Vec<serde_json::Value> = request
                    .tools
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.parameters,
                            }
                        })
                    })
                    .collect();
                obj.insert("tools".into(), tool_defs.into());
                obj.insert("tool_choice".into(), "auto".into());
                if let Some(parallel) = settings.parallel_tool_calls {
                    obj.insert("parallel_tool_calls".into(), parallel.into());
                }
            }
        }

        body
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, FinanceError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            provider = %self.provider,
            model = %self.model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat completion request"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| FinanceError::api(200, "No choices in chat completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolInvocationRequest {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: data
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            finish_reason: choice.finish_reason.as_deref().and_then(parse_finish_reason),
        })
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn message_to_openai(msg: &Message) -> serde_json::Value {
    match msg {
        Message::System { content } => serde_json::json!({ "role": "system", "content": content }),
        Message::User { content } => serde_json::json!({ "role": "user", "content": content }),
        Message::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            serde_json::json!({ "role": "assistant", "content": content })
        }
        Message::Assistant { content, tool_calls } => {
            let tc_json: Vec<serde_json::Value> = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": wire_arguments(&tc.arguments),
                        }
                    })
                })
                .collect();
            let content = if content.is_empty() {
                serde_json::Value::Null
            } else {
                content.clone().into()
            };
            serde_json::json!({
                "role": "assistant",
                "content": content,
                "tool_calls": tc_json,
            })
        }
        Message::ToolResult(result) => serde_json::json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": result.content_text(),
        }),
    }
}

/// Arguments as the `function.arguments` string. Text the model sent that was
/// not valid JSON is kept as a string and goes back verbatim.
fn wire_arguments(arguments: &serde_json::Value) -> String {
    match arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolDefinition;
    use serde_json::json;

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_string() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolInvocationRequest::new(
                "call_1",
                "stock_news_retriever",
                json!({ "ticker": "AAPL" }),
            )],
        );
        let value = message_to_openai(&msg);
        assert_eq!(value["content"], serde_json::Value::Null);
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], r#"{"ticker":"AAPL"}"#);
    }

    #[test]
    fn unparsed_arguments_are_replayed_verbatim() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolInvocationRequest::new(
                "call_1",
                "stock_news_retriever",
                json!("{ticker: AAPL"),
            )],
        );
        let value = message_to_openai(&msg);
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], "{ticker: AAPL");
    }

    #[test]
    fn tool_result_becomes_tool_role() {
        let msg = Message::tool_result("call_1", json!("NEWS 1"), false);
        let value = message_to_openai(&msg);
        assert_eq!(value, json!({ "role": "tool", "tool_call_id": "call_1", "content": "NEWS 1" }));
    }

    #[test]
    fn body_includes_tools_and_settings() {
        let provider =
            OpenAiProvider::new("groq", "llama-3.1-8b-instant", "k", "https://x.test/v1/");
        let request = ProviderRequest {
            messages: vec![Message::system("sys"), Message::user("hi")],
            settings: GenerationSettings::builder().temperature(0.0).build(),
            tools: vec![ToolDefinition {
                name: "stock_splits_history_retriever".into(),
                description: "splits".into(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tools"][0]["function"]["name"], "stock_splits_history_retriever");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(provider.base_url, "https://x.test/v1");
    }
}
