//! Configuration module for zonemux
//!
//! This module contains the configuration file schema:
//! - `root`: Main configuration and CLI overrides
//! - `server_block`: One `[[server]]` block: zones, timeouts, TSIG keys, plugins
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod errors;
pub mod logging;
pub mod root;
pub mod server_block;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server_block::{PluginConfig, ServerBlockConfig, TsigKeyConfig};
