use std::path::Path;
use std::time::Duration;

use mc_client::ClientConfig;
use mc_core::validation::normalize_max_results;
use mc_error::{McError, Result};
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "configs/default.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiCfg,
    pub health: HealthCfg,
    pub query: QueryCfg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiCfg {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthCfg {
    pub interval_secs: u64,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryCfg {
    pub default_max_results: u32,
}

impl Default for QueryCfg {
    fn default() -> Self {
        Self {
            default_max_results: 5,
        }
    }
}

impl ConsoleConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health.interval_secs)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MEDICOPILOT_API_URL") {
            self.api.base_url = url;
        }
        if let Some(v) = lookup("MEDICOPILOT_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_secs("MEDICOPILOT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("MEDICOPILOT_HEALTH_INTERVAL_SECS") {
            self.health.interval_secs = parse_secs("MEDICOPILOT_HEALTH_INTERVAL_SECS", &v)?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            return Err(McError::Configuration {
                key: "api.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.health.interval_secs == 0 {
            return Err(McError::Configuration {
                key: "health.interval_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        self.query.default_max_results =
            normalize_max_results(Some(self.query.default_max_results));
        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| McError::Configuration {
        key: key.to_string(),
        reason: format!("expected whole seconds, got {:?}", value),
    })
}

/// Reads the YAML config. The default location may be absent; an explicit
/// path must exist.
pub fn load_config(path: Option<&Path>) -> Result<ConsoleConfig> {
    load_config_with(path, |k| std::env::var(k).ok())
}

fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ConsoleConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(p) => read_file(p)?,
        None => {
            let p = Path::new(DEFAULT_CONFIG_PATH);
            if p.exists() {
                read_file(p)?
            } else {
                ConsoleConfig::default()
            }
        }
    };
    cfg.apply_env(lookup)?;
    cfg.validate()?;
    info!(base_url = %cfg.api.base_url, "load_config");
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<ConsoleConfig> {
    let s = std::fs::read_to_string(path).map_err(|e| McError::Configuration {
        key: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(serde_yaml::from_str(&s)?)
}
