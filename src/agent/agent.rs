//! The agent and its step-bounded run loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::RuntimeConfig;
use super::delegate::AGENT_CALL_TOOL;
use super::dispatch::{ToolBatch, ToolDispatcher};
use super::ledger::{render_answer, RunStep, StepState, StepType};
use super::options::RunOptions;
use super::prompt::render_system_prompt;
use super::response::{RunResult, RunStatus};
use crate::error::HubError;
use crate::memory::{MemoryStore, DEFAULT_SWEEP_INTERVAL};
use crate::middleware::{BatchContext, Middleware, MiddlewareChain};
use crate::provider::ChatProvider;
use crate::session::{Session, SessionStore};
use crate::tools::{BriefInfo, RemoteSelection, RemoteToolProtocol, Tool, ToolRegistry};
use crate::types::{ChatCompletionRequest, FinishReason, Message, ToolCall, ToolDefinition};

/// One configured conversational loop bound to a provider, tools and memory.
///
/// Cheap to clone; clones share memory and configuration.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    name: String,
    description: String,
    provider: Option<Arc<dyn ChatProvider>>,
    runtime: RuntimeConfig,
    memory: Arc<MemoryStore>,
    sessions: Arc<SessionStore>,
    dispatcher: ToolDispatcher,
    agent_briefs: Vec<BriefInfo>,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn brief(&self) -> BriefInfo {
        BriefInfo::new(&self.inner.name, &self.inner.description)
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.inner.runtime
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.inner.memory
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.inner.sessions
    }

    /// Forget one session's messages, or all of them.
    pub fn reset_memory(&self, session_id: Option<&str>) {
        self.inner.memory.clear(session_id);
    }

    /// Fresh options seeded with this agent's knobs and agent catalog.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new(self.inner.runtime.clone());
        options.agents = self.inner.agent_briefs.clone();
        options
    }

    /// Run with default options in a new session.
    pub async fn ask(&self, text: impl Into<String>) -> RunResult {
        self.run(self.run_options(), text).await
    }

    /// Answer `text`, calling tools until the provider stops.
    ///
    /// The loop body runs as a background task racing the run timeout. On
    /// expiry the run's cancellation token fires, which stops the provider
    /// call and every tool unit, and `AgentRunTimeout` is returned at once.
    /// The result always carries the ledger and a (possibly empty) answer.
    pub async fn run(&self, mut options: RunOptions, text: impl Into<String>) -> RunResult {
        let text = text.into();
        options.runtime.normalize();

        let session = self.bind_session(&mut options);
        let Some(provider) = self.inner.provider.clone() else {
            let err = HubError::Configuration(format!("agent '{}' has no provider", self.name()));
            return self.finish(&options, &session, Err(err));
        };
        if options.tools.is_empty() {
            options.tools = self.inner.dispatcher.briefs().await;
        }

        options.ledger.push(RunStep::start(&text));
        self.inner.memory.push(session.id(), [Message::user(text)]);

        let timeout_secs = options.runtime.run_timeout_secs;
        let cancel = options
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let _guard = cancel.clone().drop_guard();
        let options = Arc::new(options);

        tracing::debug!(
            agent = self.name(),
            session_id = session.id(),
            max_steps = options.runtime.max_steps,
            timeout_secs,
            "agent run start"
        );

        let body = tokio::spawn({
            let agent = self.clone();
            let options = options.clone();
            let session = session.clone();
            let cancel = cancel.clone();
            async move { agent.run_loop(provider, &options, &session, &cancel).await }
        });

        let outcome = tokio::select! {
            joined = body => joined.unwrap_or_else(|e| Err(HubError::TaskFailed(e.to_string()))),
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                cancel.cancel();
                Err(HubError::AgentRunTimeout { timeout_secs })
            }
        };
        self.finish(&options, &session, outcome)
    }

    fn bind_session(&self, options: &mut RunOptions) -> Arc<Session> {
        let session = match (&options.session, &options.session_id) {
            (Some(session), _) => session.clone(),
            (None, Some(id)) => self.inner.sessions.get_or_create(id),
            (None, None) => self.inner.sessions.create(),
        };
        session.merge_missing(&options.runtime.session_data);
        session.merge(std::mem::take(&mut options.session_data));
        options.session_id = Some(session.id().to_string());
        options.session = Some(session.clone());
        session
    }

    fn finish(
        &self,
        options: &RunOptions,
        session: &Session,
        outcome: Result<Message, HubError>,
    ) -> RunResult {
        session.touch();
        let steps = options.ledger.snapshot();
        let answer = render_answer(&steps, options.runtime.debug, options.runtime.claim.as_deref());
        let (status, message, error) = match outcome {
            Ok(message) => {
                tracing::info!(
                    agent = self.name(),
                    session_id = session.id(),
                    steps = steps.len(),
                    "agent run completed"
                );
                (RunStatus::Completed, message, None)
            }
            Err(e) => {
                tracing::warn!(
                    agent = self.name(),
                    session_id = session.id(),
                    steps = steps.len(),
                    category = ?e.category(),
                    error = %e,
                    "agent run failed"
                );
                let status = if matches!(e, HubError::AgentRunTimeout { .. }) {
                    RunStatus::TimedOut
                } else {
                    RunStatus::Failed
                };
                (status, Message::assistant("").with_session(session.id()), Some(e))
            }
        };
        RunResult {
            status,
            message,
            answer,
            steps,
            session_id: session.id().to_string(),
            error,
        }
    }

    async fn run_loop(
        &self,
        provider: Arc<dyn ChatProvider>,
        options: &RunOptions,
        session: &Arc<Session>,
        cancel: &CancellationToken,
    ) -> Result<Message, HubError> {
        let max_steps = options.runtime.max_steps;
        loop {
            if cancel.is_cancelled() {
                return Err(HubError::Canceled);
            }
            let step = options.ledger.len();
            if step > max_steps {
                return Err(HubError::ChatCompletionOverMaxStep { max_steps });
            }

            let request = self.build_request(options, session).await;
            tracing::debug!(
                agent = self.name(),
                session_id = session.id(),
                step,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "chat completion request"
            );
            let response = tokio::select! {
                response = provider.create_chat_completion(&request) => response?,
                _ = cancel.cancelled() => return Err(HubError::Canceled),
            };
            if let Some(error) = response.error {
                return Err(HubError::Provider {
                    provider: provider.provider_name().to_string(),
                    message: error.message,
                });
            }
            let choice = response.choices.into_iter().next().ok_or_else(|| HubError::Provider {
                provider: provider.provider_name().to_string(),
                message: "response carried no choices".into(),
            })?;

            let reply = choice.message;
            self.inner.memory.push(session.id(), [reply.clone()]);

            if choice.finish_reason != Some(FinishReason::ToolCalls) {
                options.ledger.push(RunStep::end(reply.text()));
                return Ok(reply.with_session(session.id()));
            }

            let ctx = BatchContext {
                agent_name: self.name(),
                session,
                options,
                cancel,
            };
            match self
                .inner
                .dispatcher
                .process_tool_calls(&reply.tool_calls, ctx)
                .await
            {
                Ok(batch) => {
                    if let Some(e) = batch.error() {
                        tracing::warn!(agent = self.name(), error = %e, "tool batch had failures");
                    }
                    self.inner
                        .memory
                        .push(session.id(), batch.results.iter().cloned());
                    options.ledger.push(batch_step(&reply, &batch));
                }
                Err(e) => {
                    // every requested call still needs an answer in memory
                    let aborted = reply
                        .tool_calls
                        .iter()
                        .map(|call| Message::tool_result(&call.id, format!("error: {e}")));
                    self.inner.memory.push(session.id(), aborted);
                    let mut step = batch_step_header(&reply);
                    step.result = e.to_string();
                    step.state = StepState::Failed;
                    options.ledger.push(step);
                    return Err(e);
                }
            }
        }
    }

    async fn build_request(
        &self,
        options: &RunOptions,
        session: &Session,
    ) -> ChatCompletionRequest {
        let runtime = &options.runtime;
        let mut messages = Vec::with_capacity(runtime.max_use_memory + 1);
        if let Some(system) = self.inner.memory.system() {
            let text = render_system_prompt(&system.text(), options, session);
            messages.push(Message::system(text));
        }
        messages.extend(self.inner.memory.latest(session.id(), runtime.max_use_memory));

        ChatCompletionRequest {
            messages,
            max_tokens: Some(runtime.max_tokens),
            temperature: Some(runtime.temperature),
            frequency_penalty: Some(runtime.frequency_penalty),
            presence_penalty: Some(runtime.presence_penalty),
            stop: runtime.stop.clone(),
            tools: self
                .inner
                .dispatcher
                .functions()
                .await
                .into_iter()
                .map(ToolDefinition::from)
                .collect(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.inner.name)
            .field("provider", &self.inner.provider.as_ref().map(|p| p.provider_name()))
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

fn batch_step_header(reply: &Message) -> RunStep {
    let calls = &reply.tool_calls;
    let delegate = calls.iter().any(|c| c.name() == AGENT_CALL_TOOL);
    RunStep {
        action: join(calls, ToolCall::name, ","),
        question: join(calls, ToolCall::arguments, "\n"),
        think: reply.text(),
        state: StepState::Running,
        end_time: Some(chrono::Utc::now()),
        step_type: if delegate {
            StepType::DelegateBatch
        } else {
            StepType::ToolBatch
        },
        ..Default::default()
    }
}

/// One ledger entry for a whole batch. Arguments and results that are
/// themselves serialized steps are merged into the entry.
fn batch_step(reply: &Message, batch: &ToolBatch) -> RunStep {
    let mut step = batch_step_header(reply);
    step.result = batch
        .results
        .iter()
        .map(Message::text)
        .collect::<Vec<_>>()
        .join("\n");
    step.state = if batch.is_failed() {
        StepState::Failed
    } else {
        StepState::Succeeded
    };
    for call in &batch.calls {
        if let Some(parsed) = RunStep::parse(call.arguments()) {
            step.merge(RunStep {
                result: String::new(),
                state: StepState::Idle,
                ..parsed
            });
        }
    }
    for result in &batch.results {
        if let Some(parsed) = RunStep::parse(&result.text()) {
            step.merge(parsed);
        }
    }
    step
}

fn join(calls: &[ToolCall], field: fn(&ToolCall) -> &str, sep: &str) -> String {
    calls.iter().map(field).collect::<Vec<_>>().join(sep)
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    description: String,
    provider: Option<Arc<dyn ChatProvider>>,
    runtime: RuntimeConfig,
    tools: ToolRegistry,
    extra_tools: Vec<Arc<dyn Tool>>,
    remote: Option<(Arc<dyn RemoteToolProtocol>, RemoteSelection)>,
    middlewares: MiddlewareChain,
    sessions: Option<Arc<SessionStore>>,
    agent_briefs: Vec<BriefInfo>,
    memory_sweep: bool,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            provider: None,
            runtime: RuntimeConfig::default(),
            tools: ToolRegistry::new(),
            extra_tools: Vec::new(),
            remote: None,
            middlewares: MiddlewareChain::new(),
            sessions: None,
            agent_briefs: Vec::new(),
            memory_sweep: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.runtime.system_prompt = prompt.into();
        self
    }

    /// Replace the local tool registry.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Add one tool; duplicates are reported by [`AgentBuilder::build`].
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.extra_tools.push(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.extra_tools.push(tool);
        self
    }

    pub fn remote_tools(
        mut self,
        remote: Arc<dyn RemoteToolProtocol>,
        selection: RemoteSelection,
    ) -> Self {
        self.remote = Some((remote, selection));
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn middlewares(mut self, middlewares: MiddlewareChain) -> Self {
        self.middlewares = middlewares;
        self
    }

    /// Share a session store with other agents.
    pub fn sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Agents listed in the `{{agents}}` catalog.
    pub fn agent_briefs(mut self, briefs: Vec<BriefInfo>) -> Self {
        self.agent_briefs = briefs;
        self
    }

    /// Run the periodic memory TTL sweep and, for an agent-owned session
    /// store, the idle session reaper (on by default, needs a tokio runtime).
    pub fn memory_sweep(mut self, enabled: bool) -> Self {
        self.memory_sweep = enabled;
        self
    }

    pub fn build(self) -> Result<Agent, HubError> {
        if self.name.trim().is_empty() {
            return Err(HubError::Configuration("agent name is empty".into()));
        }
        let runtime = self.runtime.normalized();

        let mut tools = self.tools;
        for tool in self.extra_tools {
            tools.register_arc(tool)?;
        }

        let memory = Arc::new(MemoryStore::new(
            runtime.max_store_memory,
            Duration::from_secs(runtime.memory_timeout_secs),
        ));
        if !runtime.system_prompt.is_empty() {
            memory.set_system(Message::system(&runtime.system_prompt));
        }
        let background = self.memory_sweep && tokio::runtime::Handle::try_current().is_ok();
        if background {
            memory.spawn_sweeper(DEFAULT_SWEEP_INTERVAL);
        }
        // a shared store is reaped by its owner
        let sessions = self.sessions.unwrap_or_else(|| {
            let sessions = Arc::new(SessionStore::new());
            if background {
                let ttl = Duration::from_secs(runtime.memory_timeout_secs);
                sessions.spawn_reaper(DEFAULT_SWEEP_INTERVAL, ttl);
            }
            sessions
        });

        let mut dispatcher =
            ToolDispatcher::new(Arc::new(tools)).with_middlewares(self.middlewares);
        if let Some((remote, selection)) = self.remote {
            dispatcher = dispatcher.with_remote(remote, selection);
        }

        Ok(Agent {
            inner: Arc::new(AgentInner {
                name: self.name,
                description: self.description,
                provider: self.provider,
                runtime,
                memory,
                sessions,
                dispatcher,
                agent_briefs: self.agent_briefs,
            }),
        })
    }
}
