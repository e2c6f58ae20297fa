//! Shared test helpers: scripted decision step, mock provider and fake market.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use finance_agent::agent_loop::{AgentLoop, Decision, DecisionStep};
use finance_agent::error::{FinanceError, Result};
use finance_agent::market::{
    HolderRecord, MarketDataProvider, NewsArticle, RatingAction, RatingChange, Record, StockSplit,
};
use finance_agent::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use finance_agent::tools::{finance_registry, ToolExecutor};
use finance_agent::types::*;

/// Decision step that replays queued outcomes and records every transcript it saw.
#[derive(Default)]
pub struct ScriptedDecision {
    script: Mutex<VecDeque<Result<Decision>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedDecision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final text answer.
    pub fn answer(self, text: &str) -> Self {
        self.push(Ok(Decision::new(Message::assistant(text)).with_usage(usage(30))))
    }

    /// Queue a decision requesting the given `(id, tool, ticker)` calls.
    pub fn call_tools(self, calls: &[(&str, &str, &str)]) -> Self {
        let requests = calls
            .iter()
            .map(|(id, name, ticker)| {
                ToolInvocationRequest::new(*id, *name, json!({ "ticker": ticker }))
            })
            .collect();
        self.push(Ok(
            Decision::new(Message::assistant_with_tool_calls("", requests)).with_usage(usage(15))
        ))
    }

    /// Queue a decision carrying raw requests.
    pub fn request(self, requests: Vec<ToolInvocationRequest>) -> Self {
        self.push(Ok(Decision::new(Message::assistant_with_tool_calls("", requests))))
    }

    /// Queue a backend failure.
    pub fn fail(self, message: &str) -> Self {
        self.push(Err(FinanceError::decision_unavailable(FinanceError::api(503, message))))
    }

    fn push(self, outcome: Result<Decision>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionStep for ScriptedDecision {
    async fn decide(&self, transcript: &[Message]) -> Result<Decision> {
        self.seen.lock().unwrap().push(transcript.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Decision::new(Message::assistant("Done"))))
    }
}

fn usage(total: u32) -> Usage {
    Usage {
        input_tokens: total - 5,
        output_tokens: 5,
        total_tokens: total,
    }
}

/// A mock provider that returns canned responses.
pub struct MockProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: text.to_string(),
            tool_calls: vec![],
            usage: usage(30),
            finish_reason: Some(FinishReason::Stop),
        });
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: String::new(),
            tool_calls: vec![ToolInvocationRequest::new(id, name, args)],
            usage: usage(15),
            finish_reason: Some(FinishReason::ToolCalls),
        });
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FinanceError::api(500, "no response queued"))
    }
}

/// In-memory market data. `ZZZZINVALID` is unknown to it.
#[derive(Default)]
pub struct FakeMarket;

const UNKNOWN: &str = "ZZZZINVALID";

fn known(ticker: &str) -> Result<()> {
    if ticker == UNKNOWN {
        Err(FinanceError::SymbolNotFound(ticker.to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn company_profile(&self, ticker: &str) -> Result<Record> {
        known(ticker)?;
        let mut record = Record::new();
        record.insert("symbol".into(), json!(ticker));
        record.insert("currentPrice".into(), json!(227.48));
        record.insert("sector".into(), json!("Technology"));
        Ok(record)
    }

    async fn calendar(&self, ticker: &str) -> Result<Record> {
        known(ticker)?;
        let mut record = Record::new();
        record.insert("Dividend Date".into(), json!("2025-02-13"));
        Ok(record)
    }

    async fn mutual_fund_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>> {
        known(ticker)?;
        Ok(vec![holder("Vanguard Total Stock Market Index Fund")])
    }

    async fn institutional_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>> {
        known(ticker)?;
        Ok(vec![holder("Vanguard Group Inc")])
    }

    async fn rating_changes(&self, ticker: &str) -> Result<Vec<RatingChange>> {
        known(ticker)?;
        Ok(vec![RatingChange {
            grade_date: Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            firm: "Old Firm".into(),
            to_grade: "Buy".into(),
            from_grade: "Hold".into(),
            action: RatingAction::Up,
        }])
    }

    async fn splits(&self, ticker: &str) -> Result<Vec<StockSplit>> {
        known(ticker)?;
        Ok(vec![StockSplit {
            date: NaiveDate::from_ymd_opt(2020, 8, 31).unwrap(),
            ratio: 4.0,
        }])
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        known(ticker)?;
        Ok((1..=limit)
            .map(|n| NewsArticle {
                title: format!("{ticker} headline {n}"),
                url: Some(format!("https://news.example/{n}")),
                summary: Some(format!("{ticker} summary {n}")),
                publisher: None,
                published_at: None,
            })
            .collect())
    }
}

fn holder(name: &str) -> HolderRecord {
    HolderRecord {
        date_reported: NaiveDate::from_ymd_opt(2025, 3, 31),
        holder: name.to_string(),
        pct_held: Some(0.0931),
        shares: Some(1_400_000_000),
        value: Some(318_000_000_000),
        pct_change: Some(0.01),
    }
}

/// Loop over the finance tools backed by [`FakeMarket`].
pub fn finance_loop(decision: Arc<dyn DecisionStep>) -> AgentLoop {
    let registry = Arc::new(finance_registry(Arc::new(FakeMarket)).unwrap());
    AgentLoop::new(decision, ToolExecutor::new(registry))
}
