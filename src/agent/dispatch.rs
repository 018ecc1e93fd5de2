//! Concurrent tool-call dispatch wrapped by the middleware chain.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future;
use tokio::sync::OnceCell;

use crate::error::HubError;
use crate::middleware::{BatchContext, MiddlewareChain};
use crate::tools::{
    BriefInfo, RemoteSelection, RemoteToolProtocol, ToolArguments, ToolContext, ToolFunction,
    ToolRegistry,
};
use crate::types::{Message, MessageContent, ToolCall};

/// Result text substituted for a tool that returned nothing.
pub const EMPTY_RESPONSE: &str = "empty response";

/// One failed unit of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub call_id: String,
    pub tool: String,
    pub message: String,
}

/// Outcome of one dispatched batch; `results[i]` answers `calls[i]`.
#[derive(Debug, Clone)]
pub struct ToolBatch {
    pub calls: Vec<ToolCall>,
    pub results: Vec<Message>,
    pub failures: Vec<UnitFailure>,
}

impl ToolBatch {
    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Reduce the per-unit failures into one error.
    pub fn error(&self) -> Option<HubError> {
        let first = self.failures.first()?;
        Some(HubError::ToolBatch {
            failed: self.failures.len(),
            total: self.calls.len(),
            first: format!("{} ({}): {}", first.tool, first.call_id, first.message),
        })
    }
}

struct UnitOutput {
    message: Message,
    succeeded: bool,
}

/// Resolves and runs tool calls: remote protocol first, then the local
/// registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    local: Arc<ToolRegistry>,
    remote: Option<Arc<dyn RemoteToolProtocol>>,
    selection: RemoteSelection,
    middlewares: MiddlewareChain,
    remote_functions: Arc<OnceCell<Vec<ToolFunction>>>,
}

impl ToolDispatcher {
    pub fn new(local: Arc<ToolRegistry>) -> Self {
        Self {
            local,
            remote: None,
            selection: RemoteSelection::None,
            middlewares: MiddlewareChain::new(),
            remote_functions: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_remote(
        mut self,
        remote: Arc<dyn RemoteToolProtocol>,
        selection: RemoteSelection,
    ) -> Self {
        self.remote = Some(remote);
        self.selection = selection;
        self
    }

    pub fn with_middlewares(mut self, middlewares: MiddlewareChain) -> Self {
        self.middlewares = middlewares;
        self
    }

    pub fn local(&self) -> &ToolRegistry {
        &self.local
    }

    /// Every schema published to the model: local tools, then selected remote ones.
    ///
    /// A failed remote listing is logged and retried on the next call.
    pub async fn functions(&self) -> Vec<ToolFunction> {
        let mut functions = self.local.publish();
        if let Some(remote) = self.remote_listing().await {
            functions.extend(remote.iter().cloned());
        }
        functions
    }

    pub async fn briefs(&self) -> Vec<BriefInfo> {
        let mut briefs = self.local.briefs();
        if let Some(remote) = self.remote_listing().await {
            briefs.extend(remote.iter().map(|f| BriefInfo::new(&f.name, &f.description)));
        }
        briefs
    }

    async fn remote_listing(&self) -> Option<&Vec<ToolFunction>> {
        let remote = self.remote.as_ref().filter(|_| !self.selection.is_none())?;
        let listed = self
            .remote_functions
            .get_or_try_init(|| async {
                let functions = remote.list_tools().await?;
                Ok::<_, HubError>(self.selection.filter(functions))
            })
            .await;
        match listed {
            Ok(functions) => Some(functions),
            Err(e) => {
                tracing::warn!(error = %e, "remote tool listing failed");
                None
            }
        }
    }

    /// Run one batch of tool calls.
    ///
    /// Middleware `before` hooks run first, in order; a failure there aborts
    /// the batch with `Err`. Every call then runs as its own concurrent unit
    /// and all units are joined. Unit failures become the unit's result text
    /// and are collected into [`ToolBatch::failures`]. `after` hooks run in
    /// reverse order; their failures are recorded the same way.
    pub async fn process_tool_calls(
        &self,
        calls: &[ToolCall],
        ctx: BatchContext<'_>,
    ) -> Result<ToolBatch, HubError> {
        self.middlewares.run_before(calls, ctx).await?;

        let failures = Mutex::new(Vec::new());
        let units = calls.iter().map(|call| self.run_unit(call, ctx, &failures));
        let outputs = future::join_all(units).await;

        let mut results = Vec::with_capacity(outputs.len());
        for (call, output) in calls.iter().zip(outputs) {
            // the slot holds what the model sees, after empty-output normalization
            let args = ToolArguments::parse(call.arguments());
            if let Some(key) = args.session_key().filter(|_| output.succeeded) {
                ctx.session.set(key, output.message.text());
            }
            results.push(output.message);
        }

        let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.middlewares.run_after(calls, &results, ctx).await {
            tracing::warn!(error = %e, "after hook failed");
            failures.push(UnitFailure {
                call_id: String::new(),
                tool: "middleware".into(),
                message: e.to_string(),
            });
        }

        Ok(ToolBatch {
            calls: calls.to_vec(),
            results,
            failures,
        })
    }

    async fn run_unit(
        &self,
        call: &ToolCall,
        ctx: BatchContext<'_>,
        failures: &Mutex<Vec<UnitFailure>>,
    ) -> UnitOutput {
        let args = ToolArguments::parse(call.arguments());
        let mut tool_ctx =
            ToolContext::new(&call.id, ctx.session.clone(), ctx.cancel.child_token());
        tool_ctx.agent_name = ctx.agent_name.to_string();

        let outcome = tokio::select! {
            outcome = self.invoke(call.name(), &args, &tool_ctx) => outcome,
            _ = ctx.cancel.cancelled() => Err(HubError::Canceled),
        };

        match outcome {
            Ok(content) => {
                let content = if content.is_empty() {
                    MessageContent::from(EMPTY_RESPONSE)
                } else {
                    content
                };
                UnitOutput {
                    message: Message::tool_result(&call.id, content),
                    succeeded: true,
                }
            }
            Err(e) => {
                tracing::warn!(
                    call_id = %call.id,
                    tool = call.name(),
                    error = %e,
                    "tool call failed"
                );
                failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(UnitFailure {
                        call_id: call.id.clone(),
                        tool: call.name().to_string(),
                        message: e.to_string(),
                    });
                UnitOutput {
                    message: Message::tool_result(&call.id, format!("error: {e}")),
                    succeeded: false,
                }
            }
        }
    }

    async fn invoke(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<MessageContent, HubError> {
        if let Some(remote) = &self.remote {
            match remote.proxy_call(name, args, ctx).await {
                Err(HubError::ToolNotRecognized(_)) => {}
                other => return other,
            }
        }
        match self.local.invoke(name, args, ctx).await {
            Err(HubError::ToolNotRecognized(_)) => {
                Err(HubError::ToolUnresolved(name.to_string()))
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("local", &self.local)
            .field("remote", &self.remote.is_some())
            .field("selection", &self.selection)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}
