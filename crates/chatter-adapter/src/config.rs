use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_max_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_kill_grace() -> Duration {
    Duration::from_secs(5)
}

/// Per-agent-type invocation configuration (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub command: String,
    #[serde(default)]
    pub default_args: Vec<String>,
    #[serde(default)]
    pub extra_args_for_prompt: Vec<String>,
    #[serde(default)]
    pub system_flag_name: Option<String>,
    #[serde(default = "default_max_timeout", with = "humantime_serde_duration")]
    pub max_timeout: Duration,
    #[serde(default = "default_kill_grace", with = "humantime_serde_duration")]
    pub kill_grace: Duration,
}

impl AdapterConfig {
    pub fn new(command: impl Into<String>) -> Self {
        AdapterConfig {
            command: command.into(),
            default_args: Vec::new(),
            extra_args_for_prompt: Vec::new(),
            system_flag_name: None,
            max_timeout: default_max_timeout(),
            kill_grace: default_kill_grace(),
        }
    }
}

/// Optional outbound proxy passthrough (§6.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub https_proxy: Option<String>,
    pub http_proxy: Option<String>,
}

impl ProxyConfig {
    /// Environment variables to merge into the spawned child, covering
    /// both the lower- and upper-case spellings some CLIs expect.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        if let Some(https) = &self.https_proxy {
            vars.push(("https_proxy".to_string(), https.clone()));
            vars.push(("HTTPS_PROXY".to_string(), https.clone()));
        }
        if let Some(http) = &self.http_proxy {
            vars.push(("http_proxy".to_string(), http.clone()));
            vars.push(("HTTP_PROXY".to_string(), http.clone()));
        }
        vars
    }
}

mod humantime_serde_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
