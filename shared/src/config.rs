//! Environment configuration
//!
//! Every service reads the same flat set of environment variables and pulls
//! out the sections it needs.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Loads the process environment. Keys are lowercased (`SKILL_TOPIC` -> `skill_topic`).
pub fn load_env() -> Result<Config, ConfigError> {
    Config::builder()
        .add_source(Environment::default())
        .build()
}

fn default_stream() -> String {
    "SKILLS".to_string()
}

fn default_publish_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    pub broker_url: String,
    pub skill_topic: String,
    #[serde(default = "default_stream")]
    pub skill_stream: String,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl BrokerConfig {
    pub fn from_source(source: &Config) -> Result<Self, ConfigError> {
        source.clone().try_deserialize()
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

/// Where a fresh consumer starts reading the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    #[default]
    Newest,
    Earliest,
    Offset(u64),
}

impl FromStr for StartPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" | "latest" => Ok(StartPolicy::Newest),
            "earliest" | "oldest" => Ok(StartPolicy::Earliest),
            other => other
                .parse::<u64>()
                .map(StartPolicy::Offset)
                .map_err(|_| ConfigError::Message(format!("invalid start offset policy {other:?}"))),
        }
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPolicy::Newest => f.write_str("newest"),
            StartPolicy::Earliest => f.write_str("earliest"),
            StartPolicy::Offset(offset) => write!(f, "{offset}"),
        }
    }
}
