//! Error types for the agent runtime.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all runtime operations.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("agent run timeout after {timeout_secs}s")]
    AgentRunTimeout { timeout_secs: u64 },

    #[error("chat completion exceeded the maximum of {max_steps} steps")]
    ChatCompletionOverMaxStep { max_steps: usize },

    /// The registry asked does not know this tool name; callers may fall back.
    #[error("tool not recognized: {0}")]
    ToolNotRecognized(String),

    #[error("tool unresolved in remote and local registries: {0}")]
    ToolUnresolved(String),

    #[error("tool registered twice: {0}")]
    ToolRegisterRepeat(String),

    #[error("tool registration requires a non-empty name")]
    ToolRegisterEmpty,

    #[error("tool call rejected: {0}")]
    ToolRejected(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("{failed} of {total} tool calls failed; first: {first}")]
    ToolBatch {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("run canceled")]
    Canceled,

    #[error("run task failed: {0}")]
    TaskFailed(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl HubError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_)
            | Self::ToolRegisterRepeat(_)
            | Self::ToolRegisterEmpty => ErrorCategory::Configuration,
            Self::AgentRunTimeout { .. } | Self::ChatCompletionOverMaxStep { .. } => {
                ErrorCategory::Overrun
            }
            Self::ToolNotRecognized(_) | Self::ToolUnresolved(_) | Self::ToolRejected(_) => {
                ErrorCategory::Dispatch
            }
            Self::ToolExecution { .. } | Self::ToolBatch { .. } => ErrorCategory::Tool,
            Self::Provider { .. }
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::Network(_) => ErrorCategory::Transport,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether a provider call that failed with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(status, 429 | 500..=599),
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        if self.is_retryable() {
            return RecoverySuggestion::RetryWithBackoff;
        }
        match self.category() {
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Overrun => RecoverySuggestion::IncreaseBudget,
            ErrorCategory::Tool | ErrorCategory::Dispatch => {
                RecoverySuggestion::CheckToolImplementation
            }
            _ => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrun_errors_are_classified_together() {
        let timeout = HubError::AgentRunTimeout { timeout_secs: 3 };
        let steps = HubError::ChatCompletionOverMaxStep { max_steps: 20 };
        assert_eq!(timeout.category(), ErrorCategory::Overrun);
        assert_eq!(steps.category(), ErrorCategory::Overrun);
        assert!(!timeout.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(HubError::api(503, "busy").is_retryable());
        assert!(!HubError::api(400, "bad").is_retryable());
        assert_eq!(
            HubError::api(400, "bad").category(),
            ErrorCategory::Transport
        );
    }

    #[test]
    fn unresolved_tool_is_a_dispatch_error() {
        let err = HubError::ToolUnresolved("GetWeather".into());
        assert_eq!(err.category(), ErrorCategory::Dispatch);
        assert_eq!(
            err.recovery_suggestion(),
            RecoverySuggestion::CheckToolImplementation
        );
    }
}
