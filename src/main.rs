//! agenthub CLI binary entry point.

use agenthub::cli::{Cli, Commands};
use agenthub::error::RecoverySuggestion;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => agenthub::cli::handle_run(args).await,
        Commands::Agents(args) => agenthub::cli::handle_agents(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        match e.recovery_suggestion() {
            RecoverySuggestion::CheckConfiguration => {
                eprintln!("hint: check the config file and the provider API key variables")
            }
            RecoverySuggestion::IncreaseBudget => {
                eprintln!("hint: raise max_steps or run_timeout_secs for this agent")
            }
            _ => {}
        }
        std::process::exit(1);
    }
}
