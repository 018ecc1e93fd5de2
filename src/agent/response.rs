//! Run results and their client-facing form.

use serde::{Deserialize, Serialize};

use super::ledger::RunStep;
use crate::error::HubError;
use crate::types::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    TimedOut,
}

/// Everything a run produced, including on failure.
#[derive(Debug)]
pub struct RunResult {
    pub status: RunStatus,
    /// The final assistant message; empty when the run aborted.
    pub message: Message,
    /// Rendered answer from the ledger; may be empty when the run aborted.
    pub answer: String,
    pub steps: Vec<RunStep>,
    pub session_id: String,
    pub error: Option<HubError>,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// `(message, answer)` or the error that aborted the run.
    pub fn into_result(self) -> Result<(Message, String), HubError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.message, self.answer)),
        }
    }

    pub fn to_response(&self) -> AgentResponse {
        AgentResponse {
            message: (!self.message.content.is_empty()).then(|| self.message.clone()),
            session: self.session_id.clone(),
            content: self.answer.clone(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Serializable answer handed to clients and the streaming transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
