//! Published tool schemas and the parameter builder.

use serde::{Deserialize, Serialize};

/// Reserved argument carrying the raw text input of a schema-less tool.
pub const RAW_INPUT_KEY: &str = "_raw_input_";

/// Reserved argument naming the session slot that receives the tool's result.
pub const SESSION_KEY: &str = "_session_key_";

/// JSON Schema parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    pub schema: serde_json::Value,
}

impl ToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        Self { schema }
    }

    /// A tool that takes no structured parameters. Its input arrives under
    /// [`RAW_INPUT_KEY`].
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// True when no properties are declared.
    pub fn is_schemaless(&self) -> bool {
        self.schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map_or(true, |p| p.is_empty())
    }
}

/// Builder for object parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: String, schema: serde_json::Value, required: bool) -> Self {
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn string(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({ "type": "string", "description": description.into() });
        self.property(name.into(), schema, required)
    }

    pub fn number(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({ "type": "number", "description": description.into() });
        self.property(name.into(), schema, required)
    }

    pub fn integer(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({ "type": "integer", "description": description.into() });
        self.property(name.into(), schema, required)
    }

    pub fn boolean(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({ "type": "boolean", "description": description.into() });
        self.property(name.into(), schema, required)
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = serde_json::json!({
            "type": "string",
            "description": description.into(),
            "enum": values,
        });
        self.property(name.into(), schema, required)
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// The schema of one tool as published into a provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolFunction {
    /// Publish a tool schema, adding the reserved arguments.
    ///
    /// Every function gains an optional [`SESSION_KEY`] string; a schema-less
    /// function also gains a required [`RAW_INPUT_KEY`] string.
    pub fn publish(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &ToolParameters,
    ) -> Self {
        let schemaless = params.is_schemaless();
        let mut schema = params.schema.clone();
        if let Some(obj) = schema.as_object_mut() {
            obj.entry("type").or_insert_with(|| "object".into());
            let properties = obj
                .entry("properties")
                .or_insert_with(|| serde_json::json!({}));
            if let Some(properties) = properties.as_object_mut() {
                if schemaless {
                    properties.insert(
                        RAW_INPUT_KEY.to_string(),
                        serde_json::json!({ "type": "string", "description": "raw text input" }),
                    );
                }
                properties.insert(
                    SESSION_KEY.to_string(),
                    serde_json::json!({
                        "type": "string",
                        "description": "optional session slot that receives this tool's result",
                    }),
                );
            }
            if schemaless {
                obj.insert("required".to_string(), serde_json::json!([RAW_INPUT_KEY]));
            }
        }
        Self {
            name: name.into(),
            description: description.into(),
            parameters: schema,
        }
    }
}

/// Name plus one-line description of a tool or agent, rendered into prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefInfo {
    pub name: String,
    pub description: String,
}

impl BriefInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemaless_publish_requires_raw_input() {
        let f = ToolFunction::publish("echo", "echo input", &ToolParameters::empty());
        assert_eq!(f.parameters["required"], serde_json::json!([RAW_INPUT_KEY]));
        assert_eq!(f.parameters["properties"][RAW_INPUT_KEY]["type"], "string");
        assert!(f.parameters["properties"][SESSION_KEY].is_object());
    }

    #[test]
    fn structured_publish_keeps_declared_requirements() {
        let params = ToolParameters::object()
            .string("city", "city name", true)
            .build();
        let f = ToolFunction::publish("GetWeather", "weather", &params);
        assert_eq!(f.parameters["required"], serde_json::json!(["city"]));
        assert!(f.parameters["properties"].get(RAW_INPUT_KEY).is_none());
        assert!(f.parameters["properties"][SESSION_KEY].is_object());
        // the original parameters are untouched
        assert!(params.schema["properties"].get(SESSION_KEY).is_none());
    }
}
