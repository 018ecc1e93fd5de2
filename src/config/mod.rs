//! Hub configuration documents: providers and agents, from YAML or TOML.
//!
//! ```yaml
//! providers:
//!   - name: deepseek
//!     model: deepseek-chat
//!     base_url: https://api.deepseek.com
//! agents:
//!   - name: weather
//!     provider: deepseek
//!     system_prompt: You answer weather questions.
//!     tools: [GetWeather]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

pub use crate::agent::config::{AgentConfig, RuntimeConfig};

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_PROVIDER_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// One OpenAI-compatible chat-completion endpoint.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    /// Model sent when a request leaves it empty.
    pub model: String,
    pub base_url: String,
    /// Path segment between the base url and `chat/completions`.
    pub version: String,
    /// Falls back to the `{NAME}_API_KEY` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Ceiling the model itself accepts; request values above it are capped.
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Requests per second.
    pub rate_limit: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            model: String::new(),
            base_url: String::new(),
            version: DEFAULT_API_VERSION.to_string(),
            api_key: None,
            max_tokens: DEFAULT_PROVIDER_MAX_TOKENS,
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Environment variable consulted when no key is configured.
    pub fn api_key_env_var(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase().replace('-', "_"))
    }

    /// The configured key, else the environment, else empty (no auth header).
    pub fn resolve_api_key(&self) -> String {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(self.api_key_env_var()).ok())
            .unwrap_or_default()
    }

    /// Fill zero values with defaults and reject incomplete entries.
    pub fn validate(&mut self) -> Result<(), HubError> {
        if self.version.is_empty() {
            self.version = DEFAULT_API_VERSION.to_string();
        }
        if self.max_tokens == 0 {
            self.max_tokens = DEFAULT_PROVIDER_MAX_TOKENS;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = DEFAULT_PROVIDER_TIMEOUT_SECS;
        }
        if self.rate_limit == 0 {
            self.rate_limit = DEFAULT_RATE_LIMIT;
        }
        for (field, value) in [
            ("name", &self.name),
            ("model", &self.model),
            ("base_url", &self.base_url),
        ] {
            if value.trim().is_empty() {
                return Err(HubError::Configuration(format!(
                    "provider '{}' is missing {field}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// `{base_url}/{version}/chat/completions`.
    pub fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let version = self.version.trim_matches('/');
        if version.is_empty() {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/{version}/chat/completions")
        }
    }
}

/// A whole hub: providers plus the agents that use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub providers: Vec<ProviderConfig>,
    pub agents: Vec<AgentConfig>,
}

impl HubConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, HubError> {
        serde_yaml::from_str(text)
            .map_err(|e| HubError::Configuration(format!("invalid YAML config: {e}")))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, HubError> {
        toml::from_str(text)
            .map_err(|e| HubError::Configuration(format!("invalid TOML config: {e}")))
    }

    /// Load by extension: `.yaml`/`.yml` or `.toml`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HubError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            Some("toml") => Self::from_toml_str(&text),
            _ => Err(HubError::Configuration(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Load `.env` (if present) before reading the file so provider keys can
    /// come from it.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, HubError> {
        load_dotenv();
        Self::from_file(path)
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }
}

/// Load `.env` from the working directory, ignoring a missing file.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_fill_on_validate() {
        let mut cfg = ProviderConfig {
            version: String::new(),
            max_tokens: 0,
            rate_limit: 0,
            ..ProviderConfig::new("deepseek", "deepseek-chat", "https://api.deepseek.com/")
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.version, "v1");
        assert_eq!(cfg.max_tokens, 4096);
        assert_eq!(cfg.rate_limit, 100);
        assert_eq!(
            cfg.chat_completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn provider_without_model_is_rejected() {
        let mut cfg = ProviderConfig::new("p", "", "http://localhost");
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, HubError::Configuration(ref m) if m.contains("model")));
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let cfg =
            ProviderConfig::new("agenthub-test-explicit", "m", "http://x").with_api_key("sk-1");
        assert_eq!(cfg.api_key_env_var(), "AGENTHUB_TEST_EXPLICIT_API_KEY");
        assert_eq!(cfg.resolve_api_key(), "sk-1");
    }

    #[test]
    fn debug_hides_the_key() {
        let cfg = ProviderConfig::new("p", "m", "http://x").with_api_key("secret");
        assert!(!format!("{cfg:?}").contains("secret"));
    }
}
