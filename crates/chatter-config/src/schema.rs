use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chatter_adapter::{AdapterConfig, ProxyConfig};
use chatter_queue::QueueConfig;

fn default_max_bytes() -> usize {
    chatter_context_default_max_bytes()
}

// Mirrors `chatter_context::DEFAULT_MAX_BYTES` without pulling in the
// context crate just for one constant.
fn chatter_context_default_max_bytes() -> usize {
    768 * 1024
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Logging setup (§10.1). Building a subscriber is left to
/// [`crate::init_tracing`]; installing it is left to the embedding binary,
/// mirroring how the teacher composes `tracing_subscriber::registry()`
/// layers at the call site instead of inside the library crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. "warn", "debug", "chatter_core=trace".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Top-level coordinator configuration (§10.3): the routing queue's
/// tunables, one [`AdapterConfig`] per agent family, the prompt byte
/// budget, proxy passthrough, and the external round-governance cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    /// Keyed by agent family alias ("claude-code", "codex", "gemini",
    /// "fallback", or a team member's own `agent_type` string).
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,
    /// Maximum bytes for one assembled prompt (§4.3.4, invariant 9).
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Upper bound on total routed turns, enforced by the embedding
    /// application rather than the coordinator itself (§9 Open Question:
    /// `maxRounds` is external governance, not a core invariant).
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            queue: QueueConfig::default(),
            adapters: HashMap::new(),
            max_bytes: default_max_bytes(),
            proxy: ProxyConfig::default(),
            max_rounds: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn adapter_for(&self, agent_type: &str) -> Option<&AdapterConfig> {
        self.adapters.get(agent_type)
    }

    pub fn max_timeout_for(&self, agent_type: &str) -> Duration {
        self.adapter_for(agent_type)
            .map(|a| a.max_timeout)
            .unwrap_or_else(|| Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_nonzero_max_bytes() {
        let c = CoordinatorConfig::default();
        assert!(c.max_bytes > 0);
    }

    #[test]
    fn default_config_has_no_rounds_cap() {
        let c = CoordinatorConfig::default();
        assert!(c.max_rounds.is_none());
    }

    #[test]
    fn yaml_round_trip_preserves_adapter_map() {
        let yaml = "adapters:\n  codex:\n    command: codex-cli\n    max_timeout: 120\n";
        let c: CoordinatorConfig = serde_yaml::from_str(yaml).unwrap();
        let codex = c.adapters.get("codex").unwrap();
        assert_eq!(codex.command, "codex-cli");
        assert_eq!(codex.max_timeout, Duration::from_secs(120));
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "max_bytes: 1024\n";
        let c: CoordinatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.max_bytes, 1024);
        assert_eq!(c.queue.max_queue_size, QueueConfig::default().max_queue_size);
    }
}
