//! Provider registry for name-based resolution at wiring time.

use std::collections::HashMap;
use std::sync::Arc;

use super::ChatProvider;
use crate::error::HubError;

/// Registry mapping provider names to live provider instances.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider under `name`.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Resolve a provider; unknown names are a configuration error.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ChatProvider>, HubError> {
        self.providers.get(name).cloned().ok_or_else(|| {
            HubError::Configuration(format!("no provider registered for '{name}'"))
        })
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn provider_keys(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatCompletionRequest, ChatCompletionResponse};
    use async_trait::async_trait;

    struct Stub;

    #[async_trait]
    impl ChatProvider for Stub {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn create_chat_completion(
            &self,
            _request: &ChatCompletionRequest,
        ) -> Result<ChatCompletionResponse, HubError> {
            Ok(ChatCompletionResponse::default())
        }
    }

    #[test]
    fn resolves_registered_and_rejects_unknown() {
        let mut registry = ProviderRegistry::new();
        registry.register("stub", Arc::new(Stub));
        assert!(registry.has_provider("stub"));
        assert_eq!(registry.get("stub").unwrap().provider_name(), "stub");
        assert!(matches!(
            registry.get("missing"),
            Err(HubError::Configuration(_))
        ));
    }
}
