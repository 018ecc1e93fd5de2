//! Chat-completion request and response shapes exchanged with a provider.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tools::ToolFunction;

use super::message::Message;

/// One request to the chat-completion endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// Filled in by the provider from its own configuration when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

impl From<ToolFunction> for ToolDefinition {
    fn from(function: ToolFunction) -> Self {
        Self {
            kind: "function".to_string(),
            function,
        }
    }
}

/// Provider reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Set when the endpoint reports a failure inside a 2xx body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderErrorBody>,
}

impl ChatCompletionResponse {
    /// Build a single-choice response; handy for scripted providers.
    pub fn single(message: Message, finish_reason: FinishReason) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason),
            }],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Error object embedded in a provider response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Why generation finished. Only `ToolCalls` branches the run loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    FunctionCall,
    #[serde(other)]
    Other,
}

/// Token usage for one completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Merge another usage into this one (accumulate).
    pub fn merge(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_finish_reason_does_not_fail_parsing() {
        let resp: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"x"},"finish_reason":"eos"}]}"#,
        )
        .unwrap();
        assert_eq!(resp.choices[0].finish_reason, Some(FinishReason::Other));
    }

    #[test]
    fn finish_reason_display_is_snake_case() {
        assert_eq!(FinishReason::ToolCalls.to_string(), "tool_calls");
        assert_eq!("content_filter".parse::<FinishReason>().unwrap(), FinishReason::ContentFilter);
    }

    #[test]
    fn request_omits_unset_knobs() {
        let req = ChatCompletionRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("tools").is_none());
        assert!(json.get("stream").is_none());
    }
}
