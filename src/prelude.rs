//! Convenience re-exports for common use.

pub use crate::agent::{
    Agent, AgentConfig, AgentResponse, RunOptions, RunResult, RunStatus, RunStep, RuntimeConfig,
};
pub use crate::config::{HubConfig, ProviderConfig};
pub use crate::error::{HubError, Result};
pub use crate::hub::Hub;
pub use crate::middleware::{ApprovalMiddleware, Middleware, MiddlewareChain};
pub use crate::provider::{ChatProvider, OpenAiCompatibleProvider};
pub use crate::session::{Session, SessionStore};
pub use crate::tools::{
    FunctionTool, Tool, ToolArguments, ToolContext, ToolParameters, ToolRegistry,
};
pub use crate::types::{ChatCompletionRequest, ChatCompletionResponse, FinishReason, Message, Role};
