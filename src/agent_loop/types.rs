//! Core run types for the agent loop.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Message, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// Phase of the decide/act state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Deciding,
    Acting,
    Terminal,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopOutput {
    pub run_id: RunId,
    /// Input transcript followed by everything the run appended.
    pub transcript: Vec<Message>,
    pub decision_phases: usize,
    pub acting_phases: usize,
    /// Token usage summed over every decision.
    pub usage: Usage,
}

impl LoopOutput {
    /// Text of the final assistant message.
    pub fn answer(&self) -> &str {
        match self.transcript.last() {
            Some(Message::Assistant { content, .. }) => content,
            _ => "",
        }
    }
}
