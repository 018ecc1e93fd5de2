//! Local tool registry: explicit registration keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HubError;
use crate::types::MessageContent;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext};
use super::types::{BriefInfo, ToolFunction};
use super::validation::validate_arguments;

/// Tools available to an agent, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be non-empty and unique.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), HubError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), HubError> {
        let name = tool.name().to_string();
        if name.is_empty() {
            return Err(HubError::ToolRegisterEmpty);
        }
        if self.tools.contains_key(&name) {
            return Err(HubError::ToolRegisterRepeat(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registry holding only the named tools, in the given order.
    pub fn subset(&self, names: &[String]) -> Result<ToolRegistry, HubError> {
        let mut subset = ToolRegistry::new();
        for name in names {
            let tool = self.get(name).ok_or_else(|| {
                HubError::Configuration(format!("tool '{name}' is not registered"))
            })?;
            subset.register_arc(tool)?;
        }
        Ok(subset)
    }

    /// One published schema per registered tool.
    pub fn publish(&self) -> Vec<ToolFunction> {
        self.iter()
            .map(|tool| ToolFunction::publish(tool.name(), tool.description(), tool.parameters()))
            .collect()
    }

    pub fn briefs(&self) -> Vec<BriefInfo> {
        self.iter()
            .map(|tool| BriefInfo::new(tool.name(), tool.description()))
            .collect()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// Validate and run a tool by name.
    ///
    /// Unknown names fail with [`HubError::ToolNotRecognized`].
    pub async fn invoke(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<MessageContent, HubError> {
        let tool = self
            .get(name)
            .ok_or_else(|| HubError::ToolNotRecognized(name.to_string()))?;
        validate_arguments(&args.without_reserved(), &tool.parameters().schema)
            .map_err(|message| HubError::InvalidArgument(format!("{name}: {message}")))?;
        let value = tool.execute(args, ctx).await?;
        Ok(value_to_content(value))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

/// Strings are passed through, other JSON values are rendered as text.
pub fn value_to_content(value: serde_json::Value) -> MessageContent {
    match value {
        serde_json::Value::String(text) => MessageContent::Text(text),
        serde_json::Value::Null => MessageContent::default(),
        other => MessageContent::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FunctionTool, ToolParameters};

    fn echo() -> FunctionTool {
        FunctionTool::new("echo", "echo input", ToolParameters::empty(), |args, _ctx| async move {
            Ok(serde_json::json!(args.input_text().unwrap_or_default()))
        })
    }

    fn weather() -> FunctionTool {
        let params = ToolParameters::object()
            .string("city", "city name", true)
            .build();
        FunctionTool::new("GetWeather", "weather lookup", params, |args, _ctx| async move {
            let city = args.get_str("city")?;
            Ok(serde_json::json!({ "city": city, "temp": 30 }))
        })
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo()).unwrap();
        assert!(matches!(
            registry.register(echo()),
            Err(HubError::ToolRegisterRepeat(name)) if name == "echo"
        ));
        let nameless = FunctionTool::new("", "", ToolParameters::empty(), |_a, _c| async {
            Ok(serde_json::Value::Null)
        });
        assert!(matches!(registry.register(nameless), Err(HubError::ToolRegisterEmpty)));
    }

    #[test]
    fn publish_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(weather()).unwrap();
        registry.register(echo()).unwrap();
        let names: Vec<_> = registry.publish().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["GetWeather", "echo"]);
    }

    #[test]
    fn subset_rejects_unknown_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo()).unwrap();
        let err = registry.subset(&["missing".to_string()]).unwrap_err();
        assert!(matches!(err, HubError::Configuration(_)));
        assert_eq!(registry.subset(&["echo".to_string()]).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invoke_renders_values_and_validates() {
        let mut registry = ToolRegistry::new();
        registry.register(weather()).unwrap();
        registry.register(echo()).unwrap();
        let ctx = ToolContext::detached();

        let out = registry
            .invoke("GetWeather", &ToolArguments::parse(r#"{"city":"Shenzhen"}"#), &ctx)
            .await
            .unwrap();
        assert_eq!(out.text(), r#"{"city":"Shenzhen","temp":30}"#);

        let out = registry
            .invoke("echo", &ToolArguments::parse("plain words"), &ctx)
            .await
            .unwrap();
        assert_eq!(out.text(), "plain words");

        let err = registry
            .invoke("GetWeather", &ToolArguments::parse("{}"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidArgument(_)));

        let err = registry
            .invoke("nope", &ToolArguments::parse("{}"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::ToolNotRecognized(_)));
    }
}
