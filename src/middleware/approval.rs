//! Human approval before a tool batch runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{BatchContext, Middleware};
use crate::error::HubError;
use crate::session::Session;
use crate::types::ToolCall;

/// A batch waiting for a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub agent: String,
    pub session_id: String,
    pub calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Accept,
    /// Accept this batch and every later batch of the same session.
    AcceptForSession,
    Decline,
    Cancel,
}

/// Async approval callback, e.g. backed by a UI prompt or a channel.
pub type ApprovalHandler =
    Arc<dyn Fn(ApprovalRequest) -> BoxFuture<'static, ApprovalDecision> + Send + Sync>;

/// Blocks each batch until the handler decides or the run is cancelled.
///
/// Sessions accepted with [`ApprovalDecision::AcceptForSession`] are held
/// weakly: once a session is dropped from its store and no run holds it,
/// the approval is forgotten, even if a new session reuses the id.
pub struct ApprovalMiddleware {
    handler: ApprovalHandler,
    approved_sessions: Mutex<HashMap<String, Weak<Session>>>,
}

impl ApprovalMiddleware {
    pub fn new(handler: ApprovalHandler) -> Self {
        Self {
            handler,
            approved_sessions: Mutex::new(HashMap::new()),
        }
    }

    fn session_approved(&self, session: &Arc<Session>) -> bool {
        let mut approved = self
            .approved_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        approved.retain(|_, weak| weak.strong_count() > 0);
        approved
            .get(session.id())
            .and_then(Weak::upgrade)
            .is_some_and(|known| Arc::ptr_eq(&known, session))
    }

    fn approve_session(&self, session: &Arc<Session>) {
        self.approved_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), Arc::downgrade(session));
    }
}

#[async_trait]
impl Middleware for ApprovalMiddleware {
    fn name(&self) -> &str {
        "approval"
    }

    async fn before(&self, calls: &[ToolCall], ctx: BatchContext<'_>) -> Result<(), HubError> {
        if calls.is_empty() || self.session_approved(ctx.session) {
            return Ok(());
        }
        let request = ApprovalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            agent: ctx.agent_name.to_string(),
            session_id: ctx.session.id().to_string(),
            calls: calls.to_vec(),
        };
        let decision = tokio::select! {
            decision = (self.handler)(request) => decision,
            _ = ctx.cancel.cancelled() => return Err(HubError::Canceled),
        };
        match decision {
            ApprovalDecision::Accept => Ok(()),
            ApprovalDecision::AcceptForSession => {
                self.approve_session(ctx.session);
                Ok(())
            }
            ApprovalDecision::Decline => {
                Err(HubError::ToolRejected("tool call rejected by user".into()))
            }
            ApprovalDecision::Cancel => Err(HubError::Canceled),
        }
    }
}
