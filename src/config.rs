use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_BASE_URL: &str = "http://192.168.1.100:5000/api";
pub const DEFAULT_DEVICE_IDS: [&str; 2] = ["exhaust_fan_1", "exhaust_fan_2"];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Everything up to and including `/api`, without a trailing slash.
    pub base_url: String,
    pub device_ids: [String; 2],
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            device_ids: DEFAULT_DEVICE_IDS.map(str::to_string),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads `FAN_API_URL`, `FAN_DEVICE_1`, `FAN_DEVICE_2` and
    /// `FAN_API_TIMEOUT_SECS`, falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        if let Ok(url) = env::var("FAN_API_URL") {
            config.base_url = url;
        }
        for (slot, var) in ["FAN_DEVICE_1", "FAN_DEVICE_2"].iter().enumerate() {
            if let Ok(id) = env::var(var) {
                config.device_ids[slot] = id;
            }
        }
        if let Ok(secs) = env::var("FAN_API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("parsing FAN_API_TIMEOUT_SECS={secs:?}"))?;
            config.timeout = Duration::from_secs(secs);
        }
        config.normalised()
    }

    /// Trims the trailing slash off the base URL and rejects configurations
    /// the client can't work with.
    pub fn normalised(mut self) -> Result<Self> {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        anyhow::ensure!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "base URL must be http(s): {:?}",
            self.base_url
        );
        anyhow::ensure!(
            self.device_ids.iter().all(|id| !id.is_empty()),
            "device ids must not be empty"
        );
        anyhow::ensure!(
            self.device_ids[0] != self.device_ids[1],
            "both device slots point at {:?}",
            self.device_ids[0]
        );
        anyhow::ensure!(!self.timeout.is_zero(), "request timeout must be above zero");
        Ok(self)
    }
}
