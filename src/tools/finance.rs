//! The market data tool catalogue.
//!
//! Every tool takes a single `ticker` argument, asks the market data provider
//! for one dataset and normalises the answer into tool result content.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::{Tool, ToolExecutionContext};
use super::types::ToolParameters;
use crate::error::{FinanceError, Result};
use crate::market::{MarketDataProvider, NewsArticle, RatingAction, RatingChange, StockSplit};

/// Articles included in a news digest.
pub const NEWS_DIGEST_LIMIT: usize = 5;

/// Closed set of tools offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FinanceTool {
    #[strum(serialize = "company_information_retriever")]
    CompanyInformation,
    #[strum(serialize = "last_dividend_earnings_date_retriever")]
    DividendEarningsDate,
    #[strum(serialize = "mutual_fund_holders_retriever")]
    MutualFundHolders,
    #[strum(serialize = "institutional_holders_retriever")]
    InstitutionalHolders,
    #[strum(serialize = "stock_grade_upgrades_downgrades_retriever")]
    UpgradesDowngrades,
    #[strum(serialize = "stock_splits_history_retriever")]
    SplitsHistory,
    #[strum(serialize = "stock_news_retriever")]
    News,
}

impl FinanceTool {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::CompanyInformation => "This tool retrieves key company information, including its address, industry, sector, company executives, business summary, and official website. It also provides financial details such as market capitalization, current stock price, EBITDA, total debt, total revenue, and debt-to-equity ratio.",
            Self::DividendEarningsDate => "This tool retrieves a company's last dividend date and earnings release dates. It does not provide information about historical dividend yields.",
            Self::MutualFundHolders => "This tool retrieves a company's top mutual fund holders, including their percentage of shares, stock count, and value of holdings.",
            Self::InstitutionalHolders => "This tool retrieves a company's top institutional holders, including their percentage of shares, stock count, and value of holdings.",
            Self::UpgradesDowngrades => "This tool retrieves stock rating upgrades and downgrades, providing details such as firm names, 'To Grade' and 'From Grade' changes, and the date of the rating action.",
            Self::SplitsHistory => "This tool retrieves a company's historical stock splits data.",
            Self::News => "This tool retrieves the latest news articles discussing a particular stock ticker.",
        }
    }

    /// Dataset label used in empty-result errors.
    fn dataset(self) -> &'static str {
        match self {
            Self::CompanyInformation => "company information",
            Self::DividendEarningsDate => "dividend and earnings calendar",
            Self::MutualFundHolders => "mutual fund holders",
            Self::InstitutionalHolders => "institutional holders",
            Self::UpgradesDowngrades => "upgrades/downgrades",
            Self::SplitsHistory => "stock splits",
            Self::News => "news",
        }
    }
}

/// A catalogue tool bound to a market data provider.
pub struct MarketTool {
    kind: FinanceTool,
    parameters: ToolParameters,
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketTool {
    pub fn new(kind: FinanceTool, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            kind,
            parameters: ToolParameters::ticker(),
            provider,
        }
    }

    pub fn kind(&self) -> FinanceTool {
        self.kind
    }

    fn empty(&self, ticker: &str) -> FinanceError {
        FinanceError::EmptyResult {
            ticker: ticker.to_string(),
            dataset: self.kind.dataset().to_string(),
        }
    }

    async fn fetch(&self, ticker: &str) -> Result<Value> {
        let provider = self.provider.as_ref();
        match self.kind {
            FinanceTool::CompanyInformation => {
                let profile = provider.company_profile(ticker).await?;
                if profile.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(Value::Object(profile))
            }
            FinanceTool::DividendEarningsDate => {
                let calendar = provider.calendar(ticker).await?;
                if calendar.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(Value::Object(calendar))
            }
            FinanceTool::MutualFundHolders => {
                let holders = provider.mutual_fund_holders(ticker).await?;
                if holders.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(serde_json::to_value(holders)?)
            }
            FinanceTool::InstitutionalHolders => {
                let holders = provider.institutional_holders(ticker).await?;
                if holders.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(serde_json::to_value(holders)?)
            }
            FinanceTool::UpgradesDowngrades => {
                let history = provider.rating_changes(ticker).await?;
                if history.is_empty() {
                    return Err(self.empty(ticker));
                }
                let since = start_of_year(Utc::now().date_naive());
                Ok(serde_json::to_value(filter_rating_changes(history, since))?)
            }
            FinanceTool::SplitsHistory => {
                let splits = provider.splits(ticker).await?;
                if splits.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(serde_json::to_value(splits_by_date(&splits))?)
            }
            FinanceTool::News => {
                let articles = provider.news(ticker, NEWS_DIGEST_LIMIT).await?;
                if articles.is_empty() {
                    return Err(self.empty(ticker));
                }
                Ok(Value::String(format_news_digest(&articles)))
            }
        }
    }
}

#[async_trait]
impl Tool for MarketTool {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments, _ctx: &ToolExecutionContext) -> Result<Value> {
        let ticker = normalize_ticker(args.get_str("ticker")?)?;
        self.fetch(&ticker).await
    }
}

impl std::fmt::Debug for MarketTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketTool").field("kind", &self.kind).finish()
    }
}

fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Share classes, indices and FX pairs: BRK-B, ^GSPC, EURUSD=X.
    PATTERN.get_or_init(|| {
        Regex::new(r"^\^?[A-Z0-9][A-Z0-9.\-=]{0,19}$")
            .expect("ticker validation regex must compile")
    })
}

/// Trim and upper-case a ticker, rejecting strings that cannot be a symbol.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    if !ticker_pattern().is_match(&ticker) {
        return Err(FinanceError::InvalidArgument(format!(
            "'{raw}' is not a valid ticker symbol"
        )));
    }
    Ok(ticker)
}

fn start_of_year(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
}

/// Keep upgrades and downgrades graded on or after `since`.
pub fn filter_rating_changes(changes: Vec<RatingChange>, since: NaiveDate) -> Vec<RatingChange> {
    changes
        .into_iter()
        .filter(|c| matches!(c.action, RatingAction::Up | RatingAction::Down))
        .filter(|c| c.grade_date.date_naive() >= since)
        .collect()
}

/// Split history keyed by `YYYY-MM-DD`.
pub fn splits_by_date(splits: &[StockSplit]) -> BTreeMap<String, f64> {
    splits
        .iter()
        .map(|s| (s.date.format("%Y-%m-%d").to_string(), s.ratio))
        .collect()
}

/// Plain-text digest of the first five articles.
pub fn format_news_digest(articles: &[NewsArticle]) -> String {
    let mut digest = String::new();
    for (index, article) in articles.iter().take(NEWS_DIGEST_LIMIT).enumerate() {
        let url = article.url.as_deref().unwrap_or("None");
        let summary = article
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&article.title);
        digest.push_str(&format!(
            "\nNEWS {}\n{}\nURL: {}\nSummary: {}\n",
            index + 1,
            "-".repeat(100),
            url,
            summary
        ));
        digest.push_str(&"=".repeat(100));
    }
    digest
}

/// One tool per catalogue entry, in catalogue order.
pub fn finance_tools(provider: Arc<dyn MarketDataProvider>) -> Vec<Arc<dyn Tool>> {
    FinanceTool::iter()
        .map(|kind| Arc::new(MarketTool::new(kind, provider.clone())) as Arc<dyn Tool>)
        .collect()
}

/// Registry holding the full catalogue.
pub fn finance_registry(provider: Arc<dyn MarketDataProvider>) -> Result<ToolRegistry> {
    ToolRegistry::from_tools(finance_tools(provider))
}
