//! Market data collaborator: per-ticker lookups against a finance-data service.

pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use yahoo::YahooFinanceClient;

/// Flat key/value record, as returned for profiles and calendars.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One fund or institution holding a position in the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    #[serde(rename = "Date Reported")]
    pub date_reported: Option<NaiveDate>,
    #[serde(rename = "Holder")]
    pub holder: String,
    #[serde(rename = "pctHeld")]
    pub pct_held: Option<f64>,
    #[serde(rename = "Shares")]
    pub shares: Option<i64>,
    #[serde(rename = "Value")]
    pub value: Option<i64>,
    #[serde(rename = "pctChange")]
    pub pct_change: Option<f64>,
}

/// Direction of an analyst rating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RatingAction {
    Up,
    Down,
    Main,
    Init,
    Reit,
    #[serde(other)]
    Other,
}

/// An analyst firm's rating change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    #[serde(rename = "GradeDate")]
    pub grade_date: DateTime<Utc>,
    #[serde(rename = "Firm")]
    pub firm: String,
    #[serde(rename = "ToGrade")]
    pub to_grade: String,
    #[serde(rename = "FromGrade")]
    pub from_grade: String,
    #[serde(rename = "Action")]
    pub action: RatingAction,
}

/// A historical stock split; `ratio` is new shares per old share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockSplit {
    pub date: NaiveDate,
    pub ratio: f64,
}

/// A news article mentioning the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Finance-data service keyed by instrument symbol.
///
/// Implementations return provider-native records; the tools normalise them
/// into tool result content.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Address, sector, officers, business summary and key financials.
    async fn company_profile(&self, ticker: &str) -> Result<Record>;

    /// Dividend and earnings dates.
    async fn calendar(&self, ticker: &str) -> Result<Record>;

    async fn mutual_fund_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>>;

    async fn institutional_holders(&self, ticker: &str) -> Result<Vec<HolderRecord>>;

    /// Full rating change history, newest first.
    async fn rating_changes(&self, ticker: &str) -> Result<Vec<RatingChange>>;

    async fn splits(&self, ticker: &str) -> Result<Vec<StockSplit>>;

    /// Latest articles, at most `limit`.
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>>;
}
