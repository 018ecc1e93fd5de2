//! Command line front end: run one agent from a hub config file.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures::StreamExt;

use crate::config::HubConfig;
use crate::error::HubError;
use crate::hub::Hub;
use crate::stream::{stream_answer, DEFAULT_CHUNK_CHARS};

#[derive(Parser, Debug)]
#[command(name = "agenthub", version, about = "Run LLM agents defined in a hub config")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one agent a question
    Run(RunArgs),
    /// List the agents a config defines
    Agents(AgentsArgs),
}

/// Arguments for `agenthub run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Hub config file (.yaml, .yml or .toml)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Agent to run
    #[arg(short, long)]
    pub agent: String,

    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the answer as server-sent events
    #[arg(long)]
    pub stream: bool,

    /// Include the step trace in the answer
    #[arg(long)]
    pub debug: bool,

    /// The question
    pub question: String,
}

#[derive(Parser, Debug)]
pub struct AgentsArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}

pub async fn handle_run(args: RunArgs) -> Result<(), HubError> {
    let config = HubConfig::from_file_with_env(&args.config)?;
    let hub = Hub::from_config(config)?;
    let agent = hub
        .agent(&args.agent)
        .ok_or_else(|| HubError::Configuration(format!("unknown agent '{}'", args.agent)))?;

    let mut options = agent.run_options().with_debug(args.debug);
    if let Some(session) = args.session {
        options = options.with_session_id(session);
    }
    let result = agent.run(options, args.question).await;

    if args.stream {
        let frames = stream_answer(result.to_response(), DEFAULT_CHUNK_CHARS).into_sse();
        let mut frames = std::pin::pin!(frames);
        let mut stdout = std::io::stdout();
        while let Some(frame) = frames.next().await {
            stdout.write_all(frame.as_bytes())?;
            stdout.flush()?;
        }
        return Ok(());
    }

    eprintln!("session: {}", result.session_id);
    let (_, answer) = result.into_result()?;
    println!("{answer}");
    Ok(())
}

pub fn handle_agents(args: AgentsArgs) -> Result<(), HubError> {
    let config = HubConfig::from_file(&args.config)?;
    for agent in &config.agents {
        let kind = if agent.is_delegating() { "delegating" } else { "agent" };
        println!("{}\t{kind}\t{}", agent.name, agent.description);
    }
    Ok(())
}
