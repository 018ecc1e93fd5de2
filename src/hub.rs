//! Composition root: owns the registries and builds agents from config.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{Agent, AgentCallTool, AgentConfig, AgentRegistry};
use crate::config::HubConfig;
use crate::error::HubError;
use crate::middleware::{Middleware, MiddlewareRegistry, TracingMiddleware};
use crate::provider::{ChatProvider, OpenAiCompatibleProvider, ProviderRegistry};
use crate::memory::DEFAULT_SWEEP_INTERVAL;
use crate::session::{SessionStore, DEFAULT_SESSION_TTL};
use crate::tools::{RemoteSelection, RemoteToolProtocol, Tool, ToolRegistry};

/// Providers, tools, middleware and agents resolvable by name.
///
/// Register the named parts first, then build agents from [`AgentConfig`]s.
/// Every agent built here shares the hub's session store, so a session id
/// means the same scratchpad to all of them. A hub created inside a tokio
/// runtime reaps sessions idle for [`DEFAULT_SESSION_TTL`]; use
/// [`Hub::with_session_ttl`] to pick another bound.
pub struct Hub {
    providers: ProviderRegistry,
    tools: ToolRegistry,
    remote: Option<Arc<dyn RemoteToolProtocol>>,
    middlewares: MiddlewareRegistry,
    agents: Arc<AgentRegistry>,
    sessions: Arc<SessionStore>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("providers", &self.providers)
            .field("tools", &self.tools)
            .field("remote", &self.remote.is_some())
            .field("agents", &self.agents.names())
            .finish()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_session_ttl(DEFAULT_SESSION_TTL)
    }

    /// A hub whose shared session store drops sessions idle longer than `ttl`.
    pub fn with_session_ttl(ttl: Duration) -> Self {
        let mut middlewares = MiddlewareRegistry::new();
        middlewares.register(Arc::new(TracingMiddleware));
        let sessions = Arc::new(SessionStore::new());
        if tokio::runtime::Handle::try_current().is_ok() {
            sessions.spawn_reaper(DEFAULT_SWEEP_INTERVAL, ttl);
        }
        Self {
            providers: ProviderRegistry::new(),
            tools: ToolRegistry::new(),
            remote: None,
            middlewares,
            agents: Arc::new(AgentRegistry::new()),
            sessions,
        }
    }

    /// Build a hub from a config document: one OpenAI-compatible provider per
    /// entry, then the agents.
    ///
    /// Tools and middleware cannot come from a document; use
    /// [`Hub::register_tool`] and [`Hub::build_agents`] when agents need them.
    pub fn from_config(config: HubConfig) -> Result<Self, HubError> {
        let mut hub = Self::new();
        hub.register_providers(&config)?;
        hub.build_agents(&config.agents)?;
        Ok(hub)
    }

    /// Create and register an OpenAI-compatible provider per config entry.
    pub fn register_providers(&mut self, config: &HubConfig) -> Result<(), HubError> {
        for provider in &config.providers {
            let name = provider.name.clone();
            let provider = OpenAiCompatibleProvider::new(provider.clone())?;
            self.providers.register(name, Arc::new(provider));
        }
        Ok(())
    }

    pub fn register_provider(&mut self, name: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        self.providers.register(name, provider);
    }

    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<(), HubError> {
        self.tools.register(tool)
    }

    pub fn register_tool_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), HubError> {
        self.tools.register_arc(tool)
    }

    pub fn set_remote_tools(&mut self, remote: Arc<dyn RemoteToolProtocol>) {
        self.remote = Some(remote);
    }

    pub fn register_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.register(middleware);
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn agent(&self, name: &str) -> Option<Agent> {
        self.agents.get(name)
    }

    /// Resolve every name in `config` into an agent. The agent is not
    /// registered; see [`Hub::add_agent`].
    pub fn build_agent(&self, config: &AgentConfig) -> Result<Agent, HubError> {
        config.validate()?;
        let provider = self.providers.get(&config.provider)?;

        let mut builder = Agent::builder(&config.name)
            .description(&config.description)
            .provider(provider)
            .runtime(config.runtime.clone())
            .sessions(self.sessions.clone())
            .middlewares(self.middlewares.chain(&config.middlewares)?);

        if config.is_delegating() {
            for name in &config.agents {
                if self.agents.get(name).is_none() {
                    return Err(HubError::Configuration(format!(
                        "agent '{}' delegates to unknown agent '{name}'",
                        config.name
                    )));
                }
            }
            builder = builder
                .tool(AgentCallTool::new(&self.agents, config.agents.clone()))
                .agent_briefs(self.agents.briefs(&config.agents));
        } else {
            builder = builder.tools(self.tools.subset(&config.tools)?);
        }

        let selection = RemoteSelection::from_names(&config.remote_tools);
        if !selection.is_none() {
            let remote = self.remote.clone().ok_or_else(|| {
                HubError::Configuration(format!(
                    "agent '{}' selects remote tools but none are configured",
                    config.name
                ))
            })?;
            builder = builder.remote_tools(remote, selection);
        }

        builder.build()
    }

    /// Build and register one agent.
    pub fn add_agent(&self, config: &AgentConfig) -> Result<Agent, HubError> {
        let agent = self.build_agent(config)?;
        self.agents.register(agent.clone())?;
        tracing::debug!(
            agent = agent.name(),
            provider = config.provider.as_str(),
            delegating = config.is_delegating(),
            "agent registered"
        );
        Ok(agent)
    }

    /// Register agents, plain ones first so delegating ones can name them.
    pub fn build_agents(&self, configs: &[AgentConfig]) -> Result<(), HubError> {
        let (delegating, plain): (Vec<_>, Vec<_>) =
            configs.iter().partition(|c| c.is_delegating());
        for config in plain.into_iter().chain(delegating) {
            self.add_agent(config)?;
        }
        Ok(())
    }
}
