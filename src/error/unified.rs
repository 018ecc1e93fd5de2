//! Error classification shared by the run loop and its callers.

use serde::{Deserialize, Serialize};

/// Broad error category, used by callers to branch on how a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid provider / agent setup. Fatal, never retried.
    Configuration,
    /// Step count or wall-clock budget exceeded.
    Overrun,
    /// Tool name could not be resolved, or a batch was refused before dispatch.
    Dispatch,
    /// The provider call failed.
    Transport,
    /// A tool reported a failure while running.
    Tool,
    Other,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckConfiguration,
    IncreaseBudget,
    CheckToolImplementation,
    None,
}
