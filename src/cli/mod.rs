//! CLI entry point for the finance agent.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AgentConfig;
use crate::error::Result;

/// Finance research assistant CLI
#[derive(Parser, Debug)]
#[command(name = "finance-agent", version, about = "Finance research assistant")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Model to use (format: provider:model, e.g., groq:llama-3.1-8b-instant)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Maximum tool rounds per question
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Run the tool calls of one decision concurrently
    #[arg(long, global = true)]
    pub parallel_tools: bool,
}

impl GlobalArgs {
    /// Layered config with the command-line overrides applied last.
    pub fn resolve_config(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut AgentConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
        if self.parallel_tools {
            config.parallel_tools = true;
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat
    Chat(ChatArgs),
    /// Ask a single question
    Ask(AskArgs),
    /// List the available tools
    Tools,
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Load the conversation from this file and save it back after each turn
    #[arg(short, long)]
    pub session: Option<PathBuf>,
}

/// Arguments for the `ask` subcommand.
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

impl AskArgs {
    pub fn prompt(&self) -> String {
        self.prompt.join(" ")
    }
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
