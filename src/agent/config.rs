//! Agent and runtime configuration with clamped ranges.

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HubError;

pub const DEFAULT_MAX_STEPS: usize = 20;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_STORE_MEMORY: usize = 50;
pub const DEFAULT_MAX_USE_MEMORY: usize = 20;
pub const DEFAULT_MEMORY_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 60 * 60;

/// Numeric knobs and prompt text for one agent.
///
/// Values outside their documented range are replaced by the default when
/// [`RuntimeConfig::normalize`] runs, which happens whenever an agent is
/// built. Zero counts mean "use the default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct RuntimeConfig {
    #[builder(default, into)]
    pub system_prompt: String,
    /// Ledger entries allowed before the run fails, 1..=20.
    #[builder(default = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
    /// 1..=4096.
    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    /// 0..=2, otherwise 0.3.
    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
    /// -2..=2, otherwise 0.
    #[builder(default)]
    pub frequency_penalty: f32,
    /// -2..=2, otherwise 0.
    #[builder(default)]
    pub presence_penalty: f32,
    #[builder(default)]
    pub stop: Vec<String>,
    /// Messages kept per session, 1..=50.
    #[builder(default = DEFAULT_MAX_STORE_MEMORY)]
    pub max_store_memory: usize,
    /// Messages sent per request, 1..=20.
    #[builder(default = DEFAULT_MAX_USE_MEMORY)]
    pub max_use_memory: usize,
    /// Message age limit, up to seven days.
    #[builder(default = DEFAULT_MEMORY_TIMEOUT_SECS)]
    pub memory_timeout_secs: u64,
    /// Wall-clock budget of one run, up to one hour.
    #[builder(default = DEFAULT_RUN_TIMEOUT_SECS)]
    pub run_timeout_secs: u64,
    /// Attribution line appended to rendered answers.
    pub claim: Option<String>,
    /// Render the step trace before the final answer.
    #[builder(default)]
    pub debug: bool,
    /// Initial session slots, applied to sessions that lack them.
    #[builder(default)]
    pub session_data: Map<String, Value>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RuntimeConfig {
    /// Clamp every knob into its documented range.
    pub fn normalize(&mut self) {
        self.max_steps = positive_bounded(self.max_steps, DEFAULT_MAX_STEPS);
        self.max_tokens = positive_bounded(self.max_tokens, DEFAULT_MAX_TOKENS);
        self.max_store_memory = positive_bounded(self.max_store_memory, DEFAULT_MAX_STORE_MEMORY);
        self.max_use_memory = positive_bounded(self.max_use_memory, DEFAULT_MAX_USE_MEMORY);
        self.memory_timeout_secs =
            positive_bounded(self.memory_timeout_secs, DEFAULT_MEMORY_TIMEOUT_SECS);
        self.run_timeout_secs = positive_bounded(self.run_timeout_secs, DEFAULT_RUN_TIMEOUT_SECS);
        self.temperature = in_range(self.temperature, 0.0, 2.0, DEFAULT_TEMPERATURE);
        self.frequency_penalty = in_range(self.frequency_penalty, -2.0, 2.0, 0.0);
        self.presence_penalty = in_range(self.presence_penalty, -2.0, 2.0, 0.0);
        if self.claim.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.claim = None;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

/// Zero or above-maximum values fall back to `max`, which is also the default.
fn positive_bounded<T: PartialOrd + Default + Copy>(value: T, max: T) -> T {
    if value == T::default() || value > max {
        max
    } else {
        value
    }
}

fn in_range(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if (min..=max).contains(&value) {
        value
    } else {
        fallback
    }
}

/// Wiring for one agent: which provider, tools, agents and middleware it uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    /// Provider name in the hub's provider registry.
    pub provider: String,
    #[serde(flatten)]
    pub runtime: RuntimeConfig,
    /// Local tool names.
    pub tools: Vec<String>,
    /// Remote tool names, `"*"` for all.
    pub remote_tools: Vec<String>,
    /// Agents this agent may delegate to. Non-empty makes it a delegating agent.
    pub agents: Vec<String>,
    /// Middleware names, in wrapping order.
    pub middlewares: Vec<String>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn is_delegating(&self) -> bool {
        !self.agents.is_empty()
    }

    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.trim().is_empty() {
            return Err(HubError::Configuration("agent name is empty".into()));
        }
        if self.provider.trim().is_empty() {
            return Err(HubError::Configuration(format!(
                "agent '{}' has no provider",
                self.name
            )));
        }
        if self.is_delegating() && !self.tools.is_empty() {
            return Err(HubError::Configuration(format!(
                "delegating agent '{}' cannot also list tools",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_already_normalized() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.clone().normalized(), cfg);
        assert_eq!(cfg.max_steps, 20);
        assert_eq!(cfg.run_timeout_secs, 3600);
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let cfg = RuntimeConfig::builder()
            .max_steps(0)
            .max_tokens(100_000)
            .temperature(3.5)
            .frequency_penalty(-7.0)
            .presence_penalty(1.5)
            .max_store_memory(500)
            .max_use_memory(5)
            .run_timeout_secs(0)
            .claim("  ".to_string())
            .build()
            .normalized();
        assert_eq!(cfg.max_steps, 20);
        assert_eq!(cfg.max_tokens, 4096);
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.frequency_penalty, 0.0);
        assert_eq!(cfg.presence_penalty, 1.5);
        assert_eq!(cfg.max_store_memory, 50);
        assert_eq!(cfg.max_use_memory, 5);
        assert_eq!(cfg.run_timeout_secs, 3600);
        assert_eq!(cfg.claim, None);
    }

    #[test]
    fn zero_temperature_is_kept() {
        let cfg = RuntimeConfig::builder().temperature(0.0).build().normalized();
        assert_eq!(cfg.temperature, 0.0);
    }

    #[test]
    fn agent_config_reads_flattened_runtime_knobs() {
        let cfg: AgentConfig = serde_yaml::from_str(
            "name: weather\nprovider: deepseek\nmax_steps: 5\ntools: [GetWeather]\n",
        )
        .unwrap();
        assert_eq!(cfg.runtime.max_steps, 5);
        assert_eq!(cfg.runtime.max_tokens, 4096);
        assert_eq!(cfg.tools, vec!["GetWeather"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn delegating_agent_may_not_list_tools() {
        let mut cfg = AgentConfig::new("boss", "p");
        cfg.agents = vec!["worker".into()];
        cfg.tools = vec!["x".into()];
        assert!(matches!(cfg.validate(), Err(HubError::Configuration(_))));
    }
}
