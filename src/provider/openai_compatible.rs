//! Chat Completions over HTTP for any OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::http::{bearer_headers, shared_client, status_to_error, RequestPacer};
use super::ChatProvider;
use crate::config::ProviderConfig;
use crate::error::HubError;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::util::RetryPolicy;

/// Posts requests to `{base_url}/{version}/chat/completions`.
///
/// Fills the configured model into requests that leave it empty, caps
/// `max_tokens` at the model's ceiling, paces requests to the configured
/// rate and retries rate limits and server errors.
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    config: ProviderConfig,
    url: String,
    api_key: String,
    pacer: RequestPacer,
    retry: RetryPolicy,
}

impl OpenAiCompatibleProvider {
    pub fn new(mut config: ProviderConfig) -> Result<Self, HubError> {
        config.validate()?;
        Ok(Self {
            url: config.chat_completions_url(),
            api_key: config.resolve_api_key(),
            pacer: RequestPacer::per_second(config.rate_limit),
            retry: RetryPolicy::default(),
            config,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn prepare(&self, request: &ChatCompletionRequest) -> ChatCompletionRequest {
        let mut body = request.clone();
        body.stream = false;
        if body.model.is_empty() {
            body.model = self.config.model.clone();
        }
        body.max_tokens = Some(
            body.max_tokens
                .map_or(self.config.max_tokens, |m| m.min(self.config.max_tokens)),
        );
        body
    }

    async fn send(&self, body: &ChatCompletionRequest) -> Result<ChatCompletionResponse, HubError> {
        self.pacer.acquire().await;
        let resp = shared_client()
            .post(&self.url)
            .headers(bearer_headers(&self.api_key))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        &self.config.name
    }

    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, HubError> {
        let body = self.prepare(request);
        debug!(
            provider = self.config.name.as_str(),
            model = body.model.as_str(),
            messages = body.messages.len(),
            tools = body.tools.len(),
            "chat completion"
        );
        let response = self.retry.execute(|| self.send(&body)).await?;
        if let Some(usage) = &response.usage {
            debug!(
                provider = self.config.name.as_str(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_fills_model_and_caps_tokens() {
        let mut config = ProviderConfig::new("local", "qwen", "http://localhost:8000");
        config.max_tokens = 1024;
        let provider = OpenAiCompatibleProvider::new(config).unwrap();

        let request = ChatCompletionRequest {
            max_tokens: Some(4096),
            stream: true,
            ..Default::default()
        };
        let body = provider.prepare(&request);
        assert_eq!(body.model, "qwen");
        assert_eq!(body.max_tokens, Some(1024));
        assert!(!body.stream);
    }
}
