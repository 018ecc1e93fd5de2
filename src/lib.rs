//! agenthub: a runtime for LLM-backed agents.
//!
//! An [`Agent`](agent::Agent) talks to a chat-completion
//! [`ChatProvider`](provider::ChatProvider), dispatches the tool calls it
//! asks for concurrently through a middleware chain, keeps per-session
//! memory, and stops when the provider answers without tool calls or a step
//! or time budget runs out. Agents can delegate to other agents through the
//! `AgentCall` tool.
//!
//! ```no_run
//! use std::sync::Arc;
//! use agenthub::prelude::*;
//!
//! # async fn example() -> agenthub::error::Result<()> {
//! let provider = OpenAiCompatibleProvider::new(ProviderConfig::new(
//!     "deepseek",
//!     "deepseek-chat",
//!     "https://api.deepseek.com",
//! ))?;
//! let agent = Agent::builder("assistant")
//!     .provider(Arc::new(provider))
//!     .system_prompt("You are a helpful assistant.")
//!     .build()?;
//! let (_, answer) = agent.ask("Hello!").await.into_result()?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod hub;
pub mod memory;
pub mod middleware;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod stream;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
