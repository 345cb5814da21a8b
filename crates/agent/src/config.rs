//! Agent configuration

use agent_lib::{ClientConfig, GatherConfig};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the mesos agent to watch
    #[serde(default = "default_mesos_agent_url")]
    pub mesos_agent_url: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Gather cycle interval in seconds
    #[serde(default = "default_gather_interval")]
    pub gather_interval_secs: u64,

    /// Per-request timeout for operator API calls in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Minimum spacing between GET_STATE refreshes in seconds
    #[serde(default = "default_min_state_interval")]
    pub min_state_interval_secs: u64,

    /// Buffer size of the metric point channel
    #[serde(default = "default_metric_buffer_size")]
    pub metric_buffer_size: usize,
}

fn default_mesos_agent_url() -> String {
    match std::env::var("NODE_PRIVATE_IP") {
        Ok(ip) => format!("http://{}:5051", ip),
        Err(_) => "http://localhost:5051".to_string(),
    }
}

fn default_api_port() -> u16 {
    8080
}

fn default_gather_interval() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_min_state_interval() -> u64 {
    60
}

fn default_metric_buffer_size() -> usize {
    1000
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            mesos_agent_url: default_mesos_agent_url(),
            api_port: default_api_port(),
            gather_interval_secs: default_gather_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            min_state_interval_secs: default_min_state_interval(),
            metric_buffer_size: default_metric_buffer_size(),
        }))
    }

    /// Client settings for the mesos agent operator API
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            agent_url: self.mesos_agent_url.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// Settings for the gather loop
    pub fn gather_config(&self) -> GatherConfig {
        GatherConfig {
            interval: Duration::from_secs(self.gather_interval_secs),
            min_state_interval: Duration::from_secs(self.min_state_interval_secs),
            buffer_size: self.metric_buffer_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig {
            mesos_agent_url: default_mesos_agent_url(),
            api_port: default_api_port(),
            gather_interval_secs: default_gather_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            min_state_interval_secs: default_min_state_interval(),
            metric_buffer_size: default_metric_buffer_size(),
        };

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.gather_interval_secs, 10);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.min_state_interval_secs, 60);
        assert_eq!(config.metric_buffer_size, 1000);
    }

    #[test]
    fn config_converts_to_component_settings() {
        let config = AgentConfig {
            mesos_agent_url: "http://10.0.0.5:5051".to_string(),
            api_port: 9000,
            gather_interval_secs: 5,
            fetch_timeout_secs: 3,
            min_state_interval_secs: 120,
            metric_buffer_size: 50,
        };

        let client = config.client_config();
        assert_eq!(client.agent_url, "http://10.0.0.5:5051");
        assert_eq!(client.fetch_timeout, Duration::from_secs(3));

        let gather = config.gather_config();
        assert_eq!(gather.interval, Duration::from_secs(5));
        assert_eq!(gather.min_state_interval, Duration::from_secs(120));
        assert_eq!(gather.buffer_size, 50);
    }
}
