//! Convenience re-exports for common use.

pub use crate::agent::{ChatSession, SessionManager};
pub use crate::agent_loop::{AgentLoop, DecisionStep, LoopEvent, LoopEventPayload, LoopOutput};
pub use crate::config::AgentConfig;
pub use crate::error::{FinanceError, Result};
pub use crate::market::{MarketDataProvider, YahooFinanceClient};
pub use crate::models::LanguageModel;
pub use crate::provider::ModelProvider;
pub use crate::tools::{FinanceTool, Tool, ToolExecutor, ToolRegistry};
pub use crate::types::{GenerationSettings, Message, Role, ToolInvocationRequest, ToolResult, Usage};
