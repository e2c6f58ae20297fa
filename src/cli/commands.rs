//! CLI command handlers for chat, ask and tools.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::agent::ChatSession;
use crate::agent_loop::{AgentLoop, LoopEvent, LoopEventPayload};
use crate::config::AgentConfig;
use crate::error::{FinanceError, Result};
use crate::market::{MarketDataProvider, YahooFinanceClient};
use crate::tools::finance_registry;

use super::{AskArgs, ChatArgs, GlobalArgs};

fn market_client(config: &AgentConfig) -> Result<Arc<dyn MarketDataProvider>> {
    let client = match config.get_base_url("yahoo") {
        Some(base_url) => YahooFinanceClient::with_base_url(base_url)?,
        None => YahooFinanceClient::new()?,
    };
    Ok(Arc::new(client))
}

/// Prints one `Using: <tool>` line per tool call.
fn print_tool_usage(event: LoopEvent) {
    if let LoopEventPayload::ToolCallStarted { tool_name, .. } = &event.payload {
        println!("Using: {tool_name}");
    }
}

fn build_agent(global: &GlobalArgs) -> Result<AgentLoop> {
    let config = global.resolve_config()?;
    let agent = AgentLoop::from_config(&config, market_client(&config)?)?;
    Ok(agent.with_event_sink(Arc::new(print_tool_usage)))
}

/// Handle `finance-agent ask <prompt>`.
pub async fn handle_ask(global: &GlobalArgs, args: &AskArgs) -> Result<()> {
    let agent = build_agent(global)?;
    let mut session = ChatSession::new();
    session.submit(&agent, &args.prompt()).await?;
    println!("{}", session.latest_answer().unwrap_or_default());
    Ok(())
}

/// Handle `finance-agent chat`.
pub async fn handle_chat(global: &GlobalArgs, args: &ChatArgs) -> Result<()> {
    let agent = build_agent(global)?;
    let mut session = match &args.session {
        Some(path) => ChatSession::load_or_new(path)?,
        None => ChatSession::new(),
    };

    for entry in session.display_history() {
        println!("{}: {}\n", entry.role_label(), entry.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }

        match session.submit(&agent, prompt).await {
            Ok(_) => {
                println!("\n{}\n", session.latest_answer().unwrap_or_default());
                if let Some(path) = &args.session {
                    save_session(&session, path);
                }
            }
            Err(e) => report_turn_failure(&e),
        }
    }
    Ok(())
}

/// Handle `finance-agent tools`.
pub fn handle_tools(global: &GlobalArgs) -> Result<()> {
    let config = global.resolve_config()?;
    let registry = finance_registry(market_client(&config)?)?;
    for tool in registry.tools() {
        println!("{}\n    {}\n", tool.name(), tool.description());
    }
    Ok(())
}

fn save_session(session: &ChatSession, path: &Path) {
    if let Err(e) = session.save(path) {
        error!(path = %path.display(), error = %e, "failed to save session");
        eprintln!("Could not save the session to {}: {e}", path.display());
    }
}

/// Log the real error and show the user the friendly version.
pub fn report_turn_failure(err: &FinanceError) {
    error!(error = %err, category = ?err.category(), "turn failed");
    eprintln!("{}", err.user_message());
}
