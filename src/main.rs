//! Finance agent CLI binary entry point.

use finance_agent::cli::commands::{handle_ask, handle_chat, handle_tools, report_turn_failure};
use finance_agent::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    let result = match &cli.command {
        Commands::Chat(args) => handle_chat(&cli.global, args).await,
        Commands::Ask(args) => handle_ask(&cli.global, args).await,
        Commands::Tools => handle_tools(&cli.global),
    };

    if let Err(e) = result {
        match e.category() {
            finance_agent::error::ErrorCategory::Configuration
            | finance_agent::error::ErrorCategory::Authentication => eprintln!("Error: {e}"),
            _ => report_turn_failure(&e),
        }
        std::process::exit(1);
    }
}
