//! Tool system for function calling.

pub mod arguments;
pub mod executor;
pub mod finance;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use executor::ToolExecutor;
pub use finance::{finance_registry, finance_tools, FinanceTool, MarketTool};
pub use registry::ToolRegistry;
pub use tool::{FunctionTool, Tool, ToolExecutionContext};
pub use types::ToolParameters;
