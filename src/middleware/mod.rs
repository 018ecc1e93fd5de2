//! Interceptors wrapped around each batch of tool calls.
//!
//! `before` hooks run in registration order and any failure aborts the
//! batch. `after` hooks run in reverse order once every call has finished.

pub mod approval;

pub use approval::{
    ApprovalDecision, ApprovalHandler, ApprovalMiddleware, ApprovalRequest,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::RunOptions;
use crate::error::HubError;
use crate::session::Session;
use crate::types::{Message, ToolCall};

/// What a middleware sees of the run that issued a batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub agent_name: &'a str,
    pub session: &'a Arc<Session>,
    pub options: &'a RunOptions,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn before(&self, _calls: &[ToolCall], _ctx: BatchContext<'_>) -> Result<(), HubError> {
        Ok(())
    }

    /// `results` is aligned with `calls` by position.
    async fn after(
        &self,
        _calls: &[ToolCall],
        _results: &[Message],
        _ctx: BatchContext<'_>,
    ) -> Result<(), HubError> {
        Ok(())
    }
}

/// Ordered middleware list for one agent.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    items: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.items.push(middleware);
    }

    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub async fn run_before(
        &self,
        calls: &[ToolCall],
        ctx: BatchContext<'_>,
    ) -> Result<(), HubError> {
        for middleware in &self.items {
            middleware.before(calls, ctx).await.map_err(|e| {
                tracing::warn!(
                    middleware = middleware.name(),
                    error = %e,
                    "before hook aborted tool batch"
                );
                e
            })?;
        }
        Ok(())
    }

    pub async fn run_after(
        &self,
        calls: &[ToolCall],
        results: &[Message],
        ctx: BatchContext<'_>,
    ) -> Result<(), HubError> {
        for middleware in self.items.iter().rev() {
            middleware.after(calls, results, ctx).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.items.iter().map(|m| m.name()).collect();
        f.debug_struct("MiddlewareChain").field("items", &names).finish()
    }
}

/// Named middleware available for configuration-driven wiring.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    items: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, middleware: Arc<dyn Middleware>) {
        self.items.insert(middleware.name().to_string(), middleware);
    }

    /// Build a chain from names, in the given order.
    pub fn chain(&self, names: &[String]) -> Result<MiddlewareChain, HubError> {
        let mut chain = MiddlewareChain::new();
        for name in names {
            let middleware = self.items.get(name).ok_or_else(|| {
                HubError::Configuration(format!("middleware '{name}' is not registered"))
            })?;
            chain.push(middleware.clone());
        }
        Ok(chain)
    }
}

/// Logs every batch at debug level.
#[derive(Debug, Default)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn before(&self, calls: &[ToolCall], ctx: BatchContext<'_>) -> Result<(), HubError> {
        for call in calls {
            tracing::debug!(
                agent = ctx.agent_name,
                session_id = ctx.session.id(),
                call_id = %call.id,
                tool = call.name(),
                arguments = call.arguments(),
                "tool call start"
            );
        }
        Ok(())
    }

    async fn after(
        &self,
        calls: &[ToolCall],
        results: &[Message],
        ctx: BatchContext<'_>,
    ) -> Result<(), HubError> {
        for (call, result) in calls.iter().zip(results) {
            tracing::debug!(
                agent = ctx.agent_name,
                call_id = %call.id,
                tool = call.name(),
                result_len = result.text().len(),
                "tool call done"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail_before: bool,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn before(
            &self,
            _calls: &[ToolCall],
            _ctx: BatchContext<'_>,
        ) -> Result<(), HubError> {
            self.log.lock().unwrap().push(format!("before:{}", self.name));
            if self.fail_before {
                return Err(HubError::ToolRejected(self.name.clone()));
            }
            Ok(())
        }

        async fn after(
            &self,
            _calls: &[ToolCall],
            _results: &[Message],
            _ctx: BatchContext<'_>,
        ) -> Result<(), HubError> {
            self.log.lock().unwrap().push(format!("after:{}", self.name));
            Ok(())
        }
    }

    fn recorder(
        name: &str,
        log: &Arc<Mutex<Vec<String>>>,
        fail_before: bool,
    ) -> Arc<dyn Middleware> {
        Arc::new(Recorder {
            name: name.into(),
            log: log.clone(),
            fail_before,
        })
    }

    #[tokio::test]
    async fn hooks_wrap_symmetrically() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(recorder("a", &log, false))
            .with(recorder("b", &log, false));
        let options = RunOptions::default();
        let session = Arc::new(Session::new());
        let cancel = CancellationToken::new();
        let ctx = BatchContext {
            agent_name: "t",
            session: &session,
            options: &options,
            cancel: &cancel,
        };

        chain.run_before(&[], ctx).await.unwrap();
        chain.run_after(&[], &[], ctx).await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:a", "before:b", "after:b", "after:a"]
        );
    }

    #[tokio::test]
    async fn failing_before_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(recorder("a", &log, true))
            .with(recorder("b", &log, false));
        let options = RunOptions::default();
        let session = Arc::new(Session::new());
        let cancel = CancellationToken::new();
        let ctx = BatchContext {
            agent_name: "t",
            session: &session,
            options: &options,
            cancel: &cancel,
        };

        let err = chain.run_before(&[], ctx).await.unwrap_err();
        assert!(matches!(err, HubError::ToolRejected(_)));
        assert_eq!(*log.lock().unwrap(), vec!["before:a"]);
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let mut registry = MiddlewareRegistry::new();
        registry.register(Arc::new(TracingMiddleware));
        assert_eq!(registry.chain(&["tracing".into()]).unwrap().len(), 1);
        assert!(matches!(
            registry.chain(&["audit".into()]),
            Err(HubError::Configuration(_))
        ));
    }
}
