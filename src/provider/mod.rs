//! Chat-completion provider port and its HTTP implementation.

pub mod http;
pub mod openai_compatible;
pub mod registry;

pub use openai_compatible::OpenAiCompatibleProvider;
pub use registry::ProviderRegistry;

use async_trait::async_trait;

use crate::error::HubError;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// The external endpoint queried for the next conversational turn.
///
/// Retries, rate limiting and transport concerns belong to implementations;
/// the run loop treats any `Err` as fatal for the run.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name (e.g., "openai", "deepseek").
    fn provider_name(&self) -> &str;

    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, HubError>;
}
