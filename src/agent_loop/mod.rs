//! Agent loop: alternate model decisions and tool execution until the model answers.

pub mod decision;
pub mod events;
pub mod runner;
pub mod types;

pub use decision::{Decision, DecisionStep, ModelDecisionStep, SYSTEM_PROMPT};
pub use events::{LoopEvent, LoopEventPayload, LoopEventSink};
pub use runner::AgentLoop;
pub use types::{LoopOutput, LoopState, RunId};
