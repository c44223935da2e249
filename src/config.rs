//! Configuration management for the xchain core
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::chain::{ChainInfo, ChainKind, ChainOptions};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV_VAR: &str = "XCHAIN_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub chains: HashMap<String, ChainConfig>,
}

/// Endpoint failover policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConnectorConfig {
    #[serde(default = "default_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            per_attempt_timeout_ms: default_attempt_timeout_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9102,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info,xchain_core=debug".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub kind: ChainKind,
    #[serde(default)]
    pub para_id: Option<u32>,
    pub endpoints: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ChainConfig {
    /// Chain identity derived from this entry
    pub fn info(&self) -> ChainInfo {
        ChainInfo {
            name: self.name.clone(),
            kind: self.kind,
            para_id: self.para_id,
        }
    }

    /// Connect options derived from this entry
    pub fn options(&self) -> ChainOptions {
        ChainOptions::new(self.info())
    }
}

impl Settings {
    /// Load settings from the file named by `XCHAIN_CONFIG`, or the default path
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input)?;

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.connector.per_attempt_timeout_ms == 0 {
            anyhow::bail!("connector.per_attempt_timeout_ms must be positive");
        }
        if self.connector.max_attempts == 0 {
            anyhow::bail!("connector.max_attempts must be positive");
        }

        // At least one chain must be enabled
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (key, chain) in self.enabled_chains() {
            if chain.endpoints.is_empty() {
                anyhow::bail!("Chain {} has no endpoints configured", key);
            }
            if chain.kind != ChainKind::Relay && chain.para_id.is_none() {
                anyhow::bail!("Chain {} is a {} and needs a para_id", key, chain.kind);
            }
        }

        Ok(())
    }

    /// Enabled chains, sorted by their table key
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        let mut chains: Vec<_> = self.chains.iter().filter(|(_, c)| c.enabled).collect();
        chains.sort_by(|a, b| a.0.cmp(b.0));
        chains
    }

    /// Get chain config by chain name
    pub fn get_chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains
            .get(name)
            .or_else(|| self.chains.values().find(|c| c.name == name))
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .context("Invalid substitution pattern")?;

    let result = re.replace_all(input, |cap: &regex::Captures| {
        env::var(&cap[1]).unwrap_or_default()
    });

    Ok(result.into_owned())
}
