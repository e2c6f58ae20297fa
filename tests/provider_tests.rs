//! HTTP-level tests for the Chat Completions provider.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use finance_agent::agent_loop::{DecisionStep, ModelDecisionStep};
use finance_agent::config::AgentConfig;
use finance_agent::error::FinanceError;
use finance_agent::provider::{create_provider, ModelProvider, OpenAiProvider, ProviderRequest};
use finance_agent::tools::ToolParameters;
use finance_agent::types::*;

fn request(messages: Vec<Message>) -> ProviderRequest {
    ProviderRequest {
        messages,
        settings: GenerationSettings::default(),
        tools: vec![finance_agent::provider::ToolDefinition {
            name: "stock_news_retriever".into(),
            description: "News".into(),
            parameters: ToolParameters::ticker().schema,
        }],
    }
}

#[tokio::test]
async fn tool_calls_are_parsed_with_decoded_arguments() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama-3.1-8b-instant",
            "tool_choice": "auto",
            "tools": [{ "type": "function", "function": { "name": "stock_news_retriever" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {
                            "id": "call_abc",
                            "type": "function",
                            "function": { "name": "stock_news_retriever", "arguments": "{\"ticker\":\"AAPL\"}" }
                        },
                        {
                            "type": "function",
                            "function": { "name": "company_information_retriever", "arguments": "{\"ticker\":\"AAPL\"}" }
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("groq", "llama-3.1-8b-instant", "test-key", server.uri());
    let response = provider
        .generate(&request(vec![Message::user("AAPL news?")]))
        .await
        .unwrap();

    assert_eq!(response.text, "");
    assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(response.usage.total_tokens, 150);
    assert_eq!(response.tool_calls.len(), 2);
    assert_eq!(response.tool_calls[0].id, "call_abc");
    assert_eq!(response.tool_calls[0].arguments, json!({ "ticker": "AAPL" }));
    // Missing ids are filled in so results can still be matched.
    assert!(response.tool_calls[1].id.starts_with("call_"));
    assert_ne!(response.tool_calls[1].id, "call_abc");
}

#[tokio::test]
async fn text_answer_has_no_tool_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "AAPL closed at $227.48." },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("openai", "gpt-4o-mini", "k", server.uri());
    let message = provider
        .generate(&request(vec![Message::user("price?")]))
        .await
        .unwrap()
        .into_message();

    assert_eq!(message, Message::assistant("AAPL closed at $227.48."));
}

#[tokio::test]
async fn http_errors_map_to_error_variants() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/unauthorized/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/limited/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "error": { "retry_after": 2 } })),
        )
        .mount(&server)
        .await;

    let unauthorized =
        OpenAiProvider::new("groq", "m", "k", format!("{}/unauthorized", server.uri()));
    let err = unauthorized.generate(&request(vec![Message::user("x")])).await.unwrap_err();
    assert!(matches!(err, FinanceError::Authentication(_)));

    let limited = OpenAiProvider::new("groq", "m", "k", format!("{}/limited", server.uri()));
    let err = limited.generate(&request(vec![Message::user("x")])).await.unwrap_err();
    assert!(matches!(err, FinanceError::RateLimited { retry_after_ms: Some(2000) }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn decision_step_wraps_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "messages": [{ "role": "system" }] })))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = AgentConfig::new();
    config.set_api_key("groq", "test-key");
    config.set_base_url("groq", server.uri());
    let provider: Arc<dyn ModelProvider> =
        Arc::from(create_provider(&config.language_model().unwrap(), &config).unwrap());
    let step = ModelDecisionStep::new(provider, Vec::new());

    let err = step.decide(&[Message::user("hi")]).await.unwrap_err();

    match err {
        FinanceError::DecisionUnavailable { source, .. } => {
            assert!(matches!(source.as_deref(), Some(FinanceError::Api { status: 503, .. })));
        }
        other => panic!("expected DecisionUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn tool_results_are_sent_back_as_tool_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "user", "content": "AAPL news?" },
                { "role": "assistant", "tool_calls": [{ "id": "call_1", "type": "function" }] },
                { "role": "tool", "tool_call_id": "call_1", "content": "NEWS 1" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Summary" }, "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("groq", "m", "k", server.uri());
    let transcript = vec![
        Message::user("AAPL news?"),
        Message::assistant_with_tool_calls(
            "",
            vec![ToolInvocationRequest::new(
                "call_1",
                "stock_news_retriever",
                json!({ "ticker": "AAPL" }),
            )],
        ),
        Message::tool_result("call_1", json!("NEWS 1"), false),
    ];

    let response = provider.generate(&request(transcript)).await.unwrap();
    assert_eq!(response.text, "Summary");
}

#[tokio::test]
async fn malformed_arguments_go_back_as_the_model_sent_them() {
    let server = MockServer::start().await;
    let raw = "{ticker: AAPL";

    Mock::given(method("POST"))
        .and(path("/first/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "stock_news_retriever", "arguments": raw }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/second/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "user" },
                { "role": "assistant", "tool_calls": [{ "function": { "arguments": raw } }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Please retry." }, "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first = OpenAiProvider::new("groq", "m", "k", format!("{}/first", server.uri()));
    let message = first
        .generate(&request(vec![Message::user("AAPL news?")]))
        .await
        .unwrap()
        .into_message();
    assert_eq!(message.tool_calls()[0].arguments, json!(raw));

    let second = OpenAiProvider::new("groq", "m", "k", format!("{}/second", server.uri()));
    let response = second
        .generate(&request(vec![Message::user("AAPL news?"), message]))
        .await
        .unwrap();
    assert_eq!(response.text, "Please retry.");
}
