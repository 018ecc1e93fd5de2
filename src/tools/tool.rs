//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::HubError;
use crate::session::Session;

/// Context available during tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the tool call being answered.
    pub call_id: String,
    /// Name of the agent whose run issued the call.
    pub agent_name: String,
    pub session: Arc<Session>,
    /// Cancelled when the owning run times out.
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(
        call_id: impl Into<String>,
        session: Arc<Session>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            agent_name: String::new(),
            session,
            cancel,
        }
    }

    /// A context bound to a throwaway session, for calling a tool directly.
    pub fn detached() -> Self {
        Self::new("", Arc::new(Session::new()), CancellationToken::new())
    }
}

/// Implement to expose a function to the model.
///
/// A handler error is a business failure: the dispatcher turns it into the
/// tool's result text so the next turn can react to it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    /// Execute the tool with parsed arguments. Strings are returned to the
    /// model verbatim, other values as JSON text.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, HubError>;
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, HubError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool: name, schema and a typed async handler.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, HubError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, HubError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
