//! Agents: the step-bounded run loop, its ledger and delegation.

#[allow(clippy::module_inception)]
pub mod agent;
pub mod config;
pub mod delegate;
pub mod dispatch;
pub mod ledger;
pub mod options;
pub mod prompt;
pub mod response;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, RuntimeConfig};
pub use delegate::{AgentCallTool, AgentRegistry, AGENT_CALL_TOOL};
pub use dispatch::{ToolBatch, ToolDispatcher, UnitFailure, EMPTY_RESPONSE};
pub use ledger::{Ledger, RunStep, StepState, StepType};
pub use options::RunOptions;
pub use response::{AgentResponse, RunResult, RunStatus};
