//! Shared test helpers: scripted providers and sample tools.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use agenthub::error::HubError;
use agenthub::provider::ChatProvider;
use agenthub::tools::{FunctionTool, ToolParameters};
use agenthub::types::*;

/// Replays queued responses and records every request it sees.
///
/// Once the queue is empty it keeps returning the fallback, if one was set,
/// otherwise a plain "done" answer.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatCompletionResponse>>,
    fallback: Option<ChatCompletionResponse>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatCompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// Always answer with `response`.
    pub fn looping(response: ChatCompletionResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, HubError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| text_response("done")))
    }
}

/// Never answers.
pub struct PendingProvider;

#[async_trait]
impl ChatProvider for PendingProvider {
    fn provider_name(&self) -> &str {
        "pending"
    }

    async fn create_chat_completion(
        &self,
        _request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, HubError> {
        futures::future::pending().await
    }
}

pub fn text_response(text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse::single(Message::assistant(text), FinishReason::Stop)
}

pub fn tool_calls_response(think: &str, calls: Vec<ToolCall>) -> ChatCompletionResponse {
    ChatCompletionResponse::single(
        Message::assistant_tool_calls(think, calls),
        FinishReason::ToolCalls,
    )
}

pub fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, args.to_string())
}

/// `GetWeather(city)`: "30 degrees, clear" for Shenzhen.
pub fn weather_tool() -> FunctionTool {
    FunctionTool::new(
        "GetWeather",
        "Current weather for a city",
        ToolParameters::object()
            .string("city", "City name", true)
            .build(),
        |args, _ctx| async move {
            let city = args.get_str("city")?;
            let report = if city == "Shenzhen" {
                "30 degrees, clear".to_string()
            } else {
                format!("no data for {city}")
            };
            Ok(json!(report))
        },
    )
}

/// Echoes `text` after sleeping `delay_ms`.
pub fn delayed_echo_tool() -> FunctionTool {
    FunctionTool::new(
        "Echo",
        "Echo text after a delay",
        ToolParameters::object()
            .string("text", "Text to echo", true)
            .integer("delay_ms", "Delay before answering", true)
            .build(),
        |args, _ctx| async move {
            let delay = args.get_i64("delay_ms")?;
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            Ok(json!(args.get_str("text")?))
        },
    )
}

/// Returns an empty string.
pub fn silent_tool() -> FunctionTool {
    FunctionTool::new(
        "Silent",
        "Says nothing",
        ToolParameters::object().build(),
        |_args, _ctx| async move { Ok(json!("")) },
    )
}

/// Always fails.
pub fn failing_tool() -> FunctionTool {
    FunctionTool::new(
        "Broken",
        "Always fails",
        ToolParameters::object().build(),
        |_args, _ctx| async move { Err(HubError::tool("Broken", "disk on fire")) },
    )
}
