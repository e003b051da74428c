use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server_block::ServerBlockConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings given on the command line that win over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
}

/// Root of the TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default, rename = "server")]
    pub servers: Vec<ServerBlockConfig>,
}

impl Config {
    /// Load the configuration file at `path` and apply CLI overrides.
    pub fn load(path: impl AsRef<Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        if let Some(level) = overrides.log_level {
            config.logging.level = level;
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Structural checks that do not need zone parsing.
    ///
    /// Zone keys, binds and overlaps are checked when the server blocks are
    /// expanded, because that needs the registered key enhancers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[server]] block is required".to_string(),
            ));
        }

        for (index, block) in self.servers.iter().enumerate() {
            if block.zones.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "server block #{} declares no zones",
                    index + 1
                )));
            }
            for key in &block.tsig {
                key.to_key()
                    .map_err(|e| ConfigError::Validation(e.to_string()))?;
            }
            if block.tls_cert.is_some() != block.tls_key.is_some() {
                return Err(ConfigError::Validation(format!(
                    "server block #{} must set both tls_cert and tls_key",
                    index + 1
                )));
            }
            for plugin in &block.plugins {
                if plugin.name.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "server block #{} has a plugin without a name",
                        index + 1
                    )));
                }
            }
        }

        Ok(())
    }
}
