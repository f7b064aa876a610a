use crate::error::{ConfigError, ConfigResult};
use crate::types::Asset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";
/// Two hours.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 2 * 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Prices kept per asset. Fixed, not configurable.
pub const HISTORY_CAPACITY: usize = 100;

/// Tracker configuration.
///
/// Precedence, lowest first: defaults, TOML file, environment (`PORT`,
/// `COINGECKO_API_KEY`), then CLI overrides applied by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    pub update_interval_secs: u64,
    /// Fire ticks on UTC boundaries that are multiples of the interval.
    pub align_to_interval: bool,
    pub fetch_on_startup: bool,
    pub request_timeout_secs: u64,
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub assets: Vec<Asset>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            align_to_interval: true,
            fetch_on_startup: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            assets: Asset::default_set(),
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a TOML document; omitted keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `PORT` and `COINGECKO_API_KEY` from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(key) = lookup("COINGECKO_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    /// Reject configs the tracker cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_secs must be greater than zero".into(),
            ));
        }
        if self.assets.is_empty() {
            return Err(ConfigError::Invalid("at least one asset is required".into()));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.key.trim().is_empty() || asset.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "asset key and name must not be empty".into(),
                ));
            }
            if !seen.insert(asset.key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate asset key: {}",
                    asset.key
                )));
            }
        }
        Ok(())
    }

    /// Scheduler tick period.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Upstream HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured asset keys, in configuration order.
    pub fn asset_keys(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.key.clone()).collect()
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
