//! Finance research assistant.
//!
//! A model decides, turn by turn, whether to call one of a fixed set of
//! market data tools; the tool results are fed back until it answers in
//! plain text.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use finance_agent::prelude::*;
//!
//! # async fn example() -> finance_agent::error::Result<()> {
//! let config = AgentConfig::load(None)?;
//! let market = Arc::new(YahooFinanceClient::new()?);
//! let agent = AgentLoop::from_config(&config, market)?;
//!
//! let mut session = ChatSession::new();
//! session.submit(&agent, "What is the latest news for AAPL?").await?;
//! println!("{}", session.latest_answer().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
