//! Per-run options: merged knobs, catalogs, context payload, session and ledger.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::config::RuntimeConfig;
use super::ledger::Ledger;
use crate::session::Session;
use crate::tools::BriefInfo;

/// Configuration snapshot and state for one `Agent::run` call.
///
/// Obtain one from [`Agent::run_options`](super::Agent::run_options), adjust
/// it with the `with_*` methods, and hand it to `run`. The session may outlive
/// the run and be passed to a later one.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub(crate) runtime: RuntimeConfig,
    pub(crate) tools: Vec<BriefInfo>,
    pub(crate) agents: Vec<BriefInfo>,
    pub(crate) context: Value,
    pub(crate) session: Option<Arc<Session>>,
    pub(crate) session_id: Option<String>,
    pub(crate) session_data: Map<String, Value>,
    pub(crate) ledger: Ledger,
    pub(crate) cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new(runtime: RuntimeConfig) -> Self {
        Self {
            runtime: runtime.normalized(),
            ..Default::default()
        }
    }

    /// Continue the conversation identified by `session_id`.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Run inside an existing session object, sharing its slots.
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session_id = Some(session.id().to_string());
        self.session = Some(session);
        self
    }

    /// Slots written into the session before the first request.
    pub fn with_session_data(mut self, data: Map<String, Value>) -> Self {
        self.session_data.extend(data);
        self
    }

    /// Free-form payload substituted for `{{context}}`.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Tie the run to an outer token; cancelling it stops the run.
    pub fn with_cancellation(mut self, parent: CancellationToken) -> Self {
        self.cancel = Some(parent);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.runtime.debug = debug;
        self
    }

    pub fn with_claim(mut self, claim: impl Into<String>) -> Self {
        self.runtime.claim = Some(claim.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn with_run_timeout_secs(mut self, secs: u64) -> Self {
        self.runtime.run_timeout_secs = secs;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.runtime.temperature = temperature;
        self
    }

    /// Adjust any runtime knob; values are re-clamped when the run starts.
    pub fn configure(mut self, f: impl FnOnce(&mut RuntimeConfig)) -> Self {
        f(&mut self.runtime);
        self
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn tools(&self) -> &[BriefInfo] {
        &self.tools
    }

    pub fn agents(&self) -> &[BriefInfo] {
        &self.agents
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    /// The bound session; set once the run has started.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_session_records_the_id() {
        let session = Arc::new(Session::with_id("abc"));
        let opts = RunOptions::default().with_session(session);
        assert_eq!(opts.session_id.as_deref(), Some("abc"));
        assert_eq!(opts.session().map(|s| s.id()), Some("abc"));
    }

    #[test]
    fn new_normalizes_the_runtime() {
        let mut runtime = RuntimeConfig::default();
        runtime.max_steps = 99;
        assert_eq!(RunOptions::new(runtime).runtime().max_steps, 20);
    }

    #[test]
    fn configure_edits_knobs() {
        let opts = RunOptions::default()
            .with_debug(true)
            .configure(|rt| rt.stop = vec!["###".into()]);
        assert!(opts.runtime().debug);
        assert_eq!(opts.runtime().stop, vec!["###"]);
    }
}
