//! Delegation: agents calling other agents through a tool.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;

use super::agent::Agent;
use crate::error::HubError;
use crate::tools::{BriefInfo, Tool, ToolArguments, ToolContext, ToolParameters};

/// Name of the tool a delegating agent is given.
pub const AGENT_CALL_TOOL: &str = "AgentCall";

/// Agents addressable by name.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Agent) -> Result<(), HubError> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        if agents.contains_key(agent.name()) {
            return Err(HubError::Configuration(format!(
                "agent '{}' registered twice",
                agent.name()
            )));
        }
        agents.insert(agent.name().to_string(), agent);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Agent> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Catalog entries for `names`, skipping unknown agents.
    pub fn briefs(&self, names: &[String]) -> Vec<BriefInfo> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        names
            .iter()
            .filter_map(|name| agents.get(name).map(Agent::brief))
            .collect()
    }
}

/// The `AgentCall` tool: runs the agent named by `action` on `question`
/// inside the caller's session.
///
/// The target sees the caller's session slots but none of its memory or
/// ledger, and is cancelled together with the caller's run.
pub struct AgentCallTool {
    registry: Weak<AgentRegistry>,
    allowed: Vec<String>,
    parameters: ToolParameters,
}

impl AgentCallTool {
    /// `allowed` restricts the callable agents; empty means any registered one.
    pub fn new(registry: &Arc<AgentRegistry>, allowed: Vec<String>) -> Self {
        let names: Vec<&str> = allowed.iter().map(String::as_str).collect();
        let builder = ToolParameters::object();
        let builder = if names.is_empty() {
            builder.string("action", "Name of the agent to call", true)
        } else {
            builder.string_enum("action", "Name of the agent to call", &names, true)
        };
        let parameters = builder
            .string("question", "Request passed to the agent", true)
            .string("think", "Why this agent is being called", false)
            .build();
        Self {
            registry: Arc::downgrade(registry),
            allowed,
            parameters,
        }
    }

    /// Find the target named `name`; `caller` may not target itself.
    fn resolve(&self, name: &str, caller: &str) -> Result<Agent, HubError> {
        if name == caller {
            let message = format!("agent '{name}' cannot delegate to itself");
            return Err(HubError::tool(AGENT_CALL_TOOL, message));
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == name) {
            let message = format!("agent not allowed: {name}");
            return Err(HubError::tool(AGENT_CALL_TOOL, message));
        }
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| HubError::tool(AGENT_CALL_TOOL, "agent registry dropped"))?;
        registry.get(name).ok_or_else(|| {
            HubError::tool(AGENT_CALL_TOOL, format!("no agent matches '{name}'"))
        })
    }
}

#[async_trait]
impl Tool for AgentCallTool {
    fn name(&self) -> &str {
        AGENT_CALL_TOOL
    }

    fn description(&self) -> &str {
        "Call another agent by name with a request and return its answer"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, HubError> {
        let target = self.resolve(args.get_str("action")?, &ctx.agent_name)?;
        let question = args.get_str("question")?;

        tracing::debug!(
            caller = %ctx.agent_name,
            target = target.name(),
            session_id = ctx.session.id(),
            "delegating"
        );
        let options = target
            .run_options()
            .with_session(ctx.session.clone())
            .with_session_data(ctx.session.snapshot())
            .with_cancellation(ctx.cancel.clone());
        let result = target.run(options, question).await;
        match result.error {
            Some(e) => Err(HubError::tool(target.name(), e.to_string())),
            None => Ok(serde_json::Value::String(result.answer)),
        }
    }
}

impl std::fmt::Debug for AgentCallTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCallTool")
            .field("allowed", &self.allowed)
            .finish()
    }
}
