//! Yahoo Finance HTTP client.
//!
//! Uses the public `quoteSummary`, `chart` and `search` endpoints. Yahoo wants
//! a session cookie plus a matching crumb on `quoteSummary`; both are fetched
//! lazily and cached for the client's lifetime.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{
    HolderRecord, MarketDataProvider, NewsArticle, RatingAction, RatingChange, Record, StockSplit,
};
use crate::error::{FinanceError, Result};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const PROFILE_MODULES: &str = "assetProfile,price,summaryDetail,financialData,defaultKeyStatistics";

/// Yahoo Finance implementation of [`MarketDataProvider`].
pub struct YahooFinanceClient {
    http: reqwest::Client,
    base_url: String,
    cookie_url: Option<String>,
    crumb: OnceCell<Option<String>>,
}

impl YahooFinanceClient {
    /// Client against the public Yahoo endpoints.
    pub fn new() -> Result<Self> {
        Self::build(DEFAULT_BASE_URL.to_string(), Some(COOKIE_URL.to_string()))
    }

    /// Client against another host (mirrors, test servers). No cookie bootstrap.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), None)
    }

    fn build(base_url: String, cookie_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url,
            crumb: OnceCell::new(),
        })
    }

    /// Crumb for `quoteSummary`, fetched on first use. A failed fetch is
    /// remembered too, so later calls go out without one.
    async fn crumb(&self) -> Option<&str> {
        self.crumb
            .get_or_init(|| async {
                match self.fetch_crumb().await {
                    Ok(crumb) => Some(crumb),
                    Err(e) => {
                        warn!(error = %e, "continuing without Yahoo crumb");
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    async fn fetch_crumb(&self) -> Result<String> {
        if let Some(cookie_url) = &self.cookie_url {
            // Only the Set-Cookie matters here; the status is usually 404.
            let _ = self.http.get(cookie_url).send().await?;
        }
        let resp = self
            .http
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status != 200 || body.trim().is_empty() {
            return Err(FinanceError::DataProvider(format!(
                "crumb request failed with status {status}"
            )));
        }
        Ok(body.trim().to_string())
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        ticker: &str,
        envelope: &str,
    ) -> Result<Value> {
        debug!(url, ticker, "yahoo request");
        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status().as_u16();
        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(_) if status != 200 => Value::Null,
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = body
            .get(envelope)
            .and_then(|e| e.get("error"))
            .filter(|e| !e.is_null())
        {
            return Err(envelope_error(ticker, error));
        }
        match status {
            200 => Ok(body),
            404 => Err(FinanceError::SymbolNotFound(ticker.to_string())),
            429 => Err(FinanceError::RateLimited { retry_after_ms: None }),
            other => Err(FinanceError::DataProvider(format!(
                "Yahoo Finance returned status {other} for {ticker}"
            ))),
        }
    }

    /// Fetch `quoteSummary` modules and return the first result object.
    async fn quote_summary(&self, ticker: &str, modules: &str) -> Result<Record> {
        let mut query = vec![("modules", modules.to_string())];
        if let Some(crumb) = self.crumb().await {
            query.push(("crumb", crumb.to_string()));
        }
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let body = self.get_json(&url, &query, ticker, "quoteSummary").await?;
        body.pointer("/quoteSummary/result/0")
            .and_then(|r| r.as_object())
            .cloned()
            .ok_or_else(|| FinanceError::SymbolNotFound(ticker.to_string()))
    }

    async fn ownership(&self, ticker: &str, module: &str) -> Result<Vec<HolderRecord>> {
        let result = self.quote_summary(ticker, module).await?;
        let list = result
            .get(module)
            .and_then(|m| m.get("ownershipList"))
            .and_then(|l| l.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(list.iter().filter_map(parse_holder).collect())
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn company_profile(&self, ticker: &str) -> Result<Record> {
        let result = self.quote_summary(ticker, PROFILE_MODULES).await?;
        let mut profile = Record::new();
        for module in result.values() {
            if let Value::Object(fields) = flatten_raw(module.clone()) {
                for (key, value) in fields {
                    if key == "maxAge" || value.is_null() {
                        continue;
                    }
                    profile.entry(key).or_insert(value);
                }
            }
        }
        Ok(profile)
    }

    async fn calendar(&self, ticker: &str) -> Result<Record> {
        let result = self.quote_summary(ticker, "calendarEvents").await?;
        let events = result.get("calendarEvents").cloned().unwrap_or(Value::Null);
        Ok(normalize_calendar(&events))
    }

    async fn mutual_fund_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>> {
        self.ownership(ticker, "fundOwnership").await
    }

    async fn institutional_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>> {
        self.ownership(ticker, "institutionOwnership").await
    }

    async fn rating_changes(&self, ticker: &str) -> Result<Vec<RatingChange>> {
        let result = self.quote_summary(ticker, "upgradeDowngradeHistory").await?;
        let history = result
            .get("upgradeDowngradeHistory")
            .and_then(|m| m.get("history"))
            .and_then(|h| h.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(history.iter().filter_map(parse_rating_change).collect())
    }

    async fn splits(&self, ticker: &str) -> Result<Vec<StockSplit>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let query = [
            ("range", "max".to_string()),
            ("interval", "1mo".to_string()),
            ("events", "split".to_string()),
        ];
        let body = self.get_json(&url, &query, ticker, "chart").await?;
        let splits = body
            .pointer("/chart/result/0/events/splits")
            .and_then(|s| s.as_object())
            .cloned()
            .unwrap_or_default();
        let mut parsed: Vec<StockSplit> = splits.values().filter_map(parse_split).collect();
        parsed.sort_by_key(|s| s.date);
        Ok(parsed)
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let query = [
            ("q", ticker.to_string()),
            ("quotesCount", "0".to_string()),
            ("newsCount", limit.to_string()),
        ];
        let body = self.get_json(&url, &query, ticker, "finance").await?;
        let items = body
            .get("news")
            .and_then(|n| n.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(items.iter().filter_map(parse_article).take(limit).collect())
    }
}

fn envelope_error(ticker: &str, error: &Value) -> FinanceError {
    let code = error.get("code").and_then(|c| c.as_str()).unwrap_or_default();
    let description = error
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or("unknown error");
    if code.eq_ignore_ascii_case("not found") {
        FinanceError::SymbolNotFound(ticker.to_string())
    } else {
        FinanceError::DataProvider(format!("{code}: {description}"))
    }
}

/// Replace Yahoo's `{"raw": .., "fmt": ..}` wrappers with the raw value and
/// empty wrappers with null, recursively.
pub fn flatten_raw(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(raw) = map.get("raw") {
                return raw.clone();
            }
            if map.is_empty() {
                return Value::Null;
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, flatten_raw(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_raw).collect()),
        other => other,
    }
}

fn raw_i64(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value
        .get("raw")
        .unwrap_or(value)
        .as_i64()
        .or_else(|| value.get("raw").unwrap_or(value).as_f64().map(|f| f as i64))
}

fn raw_f64(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    value.get("raw").unwrap_or(value).as_f64()
}

fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn epoch_to_date(secs: i64) -> Option<NaiveDate> {
    epoch_to_datetime(secs).map(|dt| dt.date_naive())
}

fn normalize_calendar(events: &Value) -> Record {
    let mut calendar = Record::new();
    let date_field = |v: Option<&Value>| raw_i64(v).and_then(epoch_to_date).map(|d| d.to_string());

    if let Some(date) = date_field(events.get("dividendDate")) {
        calendar.insert("Dividend Date".into(), date.into());
    }
    if let Some(date) = date_field(events.get("exDividendDate")) {
        calendar.insert("Ex-Dividend Date".into(), date.into());
    }
    if let Some(earnings) = events.get("earnings") {
        let dates: Vec<Value> = earnings
            .get("earningsDate")
            .and_then(|d| d.as_array())
            .into_iter()
            .flatten()
            .filter_map(|d| date_field(Some(d)))
            .map(Value::from)
            .collect();
        if !dates.is_empty() {
            calendar.insert("Earnings Date".into(), Value::Array(dates));
        }
        let numeric = [
            ("earningsHigh", "Earnings High"),
            ("earningsLow", "Earnings Low"),
            ("earningsAverage", "Earnings Average"),
            ("revenueHigh", "Revenue High"),
            ("revenueLow", "Revenue Low"),
            ("revenueAverage", "Revenue Average"),
        ];
        for (source, label) in numeric {
            if let Some(v) = raw_f64(earnings.get(source)) {
                calendar.insert(label.into(), v.into());
            }
        }
    }
    calendar
}

fn parse_holder(entry: &Value) -> Option<HolderRecord> {
    Some(HolderRecord {
        date_reported: raw_i64(entry.get("reportDate")).and_then(epoch_to_date),
        holder: entry.get("organization")?.as_str()?.to_string(),
        pct_held: raw_f64(entry.get("pctHeld")),
        shares: raw_i64(entry.get("position")),
        value: raw_i64(entry.get("value")),
        pct_change: raw_f64(entry.get("pctChange")),
    })
}

fn parse_rating_change(entry: &Value) -> Option<RatingChange> {
    let action = entry
        .get("action")
        .and_then(|a| serde_json::from_value::<RatingAction>(a.clone()).ok())
        .unwrap_or(RatingAction::Other);
    Some(RatingChange {
        grade_date: raw_i64(entry.get("epochGradeDate")).and_then(epoch_to_datetime)?,
        firm: entry.get("firm")?.as_str()?.to_string(),
        to_grade: entry.get("toGrade").and_then(|g| g.as_str()).unwrap_or_default().to_string(),
        from_grade: entry.get("fromGrade").and_then(|g| g.as_str()).unwrap_or_default().to_string(),
        action,
    })
}

fn parse_split(entry: &Value) -> Option<StockSplit> {
    let date = raw_i64(entry.get("date")).and_then(epoch_to_date)?;
    let numerator = raw_f64(entry.get("numerator"))?;
    let denominator = raw_f64(entry.get("denominator")).filter(|d| *d != 0.0)?;
    Some(StockSplit {
        date,
        ratio: numerator / denominator,
    })
}

fn parse_article(entry: &Value) -> Option<NewsArticle> {
    // Newer payloads nest everything under "content".
    if let Some(content) = entry.get("content").filter(|c| c.is_object()) {
        return Some(NewsArticle {
            title: content.get("title")?.as_str()?.to_string(),
            url: content
                .pointer("/clickThroughUrl/url")
                .or_else(|| content.pointer("/canonicalUrl/url"))
                .and_then(|u| u.as_str())
                .map(str::to_string),
            summary: content.get("summary").and_then(|s| s.as_str()).map(str::to_string),
            publisher: content
                .pointer("/provider/displayName")
                .and_then(|p| p.as_str())
                .map(str::to_string),
            published_at: content
                .get("pubDate")
                .and_then(|d| d.as_str())
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc)),
        });
    }
    Some(NewsArticle {
        title: entry.get("title")?.as_str()?.to_string(),
        url: entry.get("link").and_then(|l| l.as_str()).map(str::to_string),
        summary: entry.get("summary").and_then(|s| s.as_str()).map(str::to_string),
        publisher: entry.get("publisher").and_then(|p| p.as_str()).map(str::to_string),
        published_at: raw_i64(entry.get("providerPublishTime")).and_then(epoch_to_datetime),
    })
}
