//! Typed access to tool call arguments.

use crate::error::HubError;

use super::types::{RAW_INPUT_KEY, SESSION_KEY};

/// Parsed tool call arguments.
///
/// Built from the raw argument text the model emitted. Text that is not a
/// JSON object is kept under [`RAW_INPUT_KEY`] so schema-less tools still
/// receive it.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse raw argument text as emitted in a tool call.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::new(serde_json::json!({}));
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value @ serde_json::Value::Object(_)) => Self::new(value),
            Ok(serde_json::Value::String(text)) => Self::raw_input(text),
            _ => Self::raw_input(trimmed),
        }
    }

    fn raw_input(text: impl Into<String>) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(RAW_INPUT_KEY.to_string(), serde_json::Value::String(text.into()));
        Self::new(serde_json::Value::Object(map))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// The raw text input of a schema-less tool, if any.
    pub fn input_text(&self) -> Option<&str> {
        self.get_str_opt(RAW_INPUT_KEY)
    }

    /// Session slot that should receive this call's result.
    pub fn session_key(&self) -> Option<&str> {
        self.get_str_opt(SESSION_KEY).filter(|key| !key.is_empty())
    }

    /// Arguments with the reserved keys removed, as handed to validation.
    pub fn without_reserved(&self) -> serde_json::Value {
        let mut value = self.value.clone();
        if let Some(obj) = value.as_object_mut() {
            obj.remove(SESSION_KEY);
        }
        value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, HubError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| HubError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, HubError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| HubError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, HubError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| HubError::InvalidArgument(format!("Missing float argument: {key}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, HubError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| HubError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, HubError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            HubError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_text_is_parsed() {
        let args = ToolArguments::parse(r#"{"city":"Shenzhen","_session_key_":"weather"}"#);
        assert_eq!(args.get_str("city").unwrap(), "Shenzhen");
        assert_eq!(args.session_key(), Some("weather"));
        assert!(args.without_reserved().get(SESSION_KEY).is_none());
    }

    #[test]
    fn plain_text_lands_under_raw_input() {
        let args = ToolArguments::parse("what is 2+2");
        assert_eq!(args.input_text(), Some("what is 2+2"));
    }

    #[test]
    fn json_string_is_unwrapped_into_raw_input() {
        let args = ToolArguments::parse(r#""hello""#);
        assert_eq!(args.input_text(), Some("hello"));
    }

    #[test]
    fn empty_text_is_an_empty_object() {
        let args = ToolArguments::parse("  ");
        assert_eq!(args.raw(), &serde_json::json!({}));
        assert_eq!(args.session_key(), None);
    }

    #[test]
    fn missing_argument_is_invalid() {
        let err = ToolArguments::parse("{}").get_str("city").unwrap_err();
        assert!(matches!(err, HubError::InvalidArgument(_)));
    }
}
