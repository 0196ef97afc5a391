use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the gateway reaches the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Topology {
    /// Engine linked into the gateway process
    #[default]
    InProcess,
    /// Engine on a remote host behind a duplex channel
    Relay,
}

impl Topology {
    /// Port used when none is configured
    pub fn default_port(self) -> u16 {
        match self {
            Topology::InProcess => 8080,
            Topology::Relay => 3000,
        }
    }
}

/// Relay topology settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Upper bound on the wait for an engine reply
    pub call_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
        }
    }
}

impl RelayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// History and current-params store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON document holding current params and history
    pub data_file: String,

    /// Maximum number of history records kept
    pub history_limit: usize,

    /// Directory of `*.json` call fixtures served by the test runner endpoint
    pub test_data_dir: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: "data.json".to_string(),
            history_limit: 50,
            test_data_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_topology_names() {
        assert_eq!(Topology::from_str("in-process").unwrap(), Topology::InProcess);
        assert_eq!(Topology::Relay.to_string(), "relay");
        assert_eq!(Topology::Relay.default_port(), 3000);
        let parsed: Topology = serde_json::from_str("\"relay\"").unwrap();
        assert_eq!(parsed, Topology::Relay);
    }

    #[test]
    fn test_partial_store_config() {
        let config: StoreConfig = serde_json::from_str(r#"{"history_limit": 5}"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.data_file, "data.json");
        assert!(config.test_data_dir.is_none());
    }
}
