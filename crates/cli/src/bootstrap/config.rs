use std::path::Path;
use std::sync::Arc;
use tracing::info;
use zonemux_application::services::{KeyEnhancerRegistry, ServerConfig};
use zonemux_application::use_cases::InspectServerBlocksUseCase;
use zonemux_domain::{CliOverrides, Config};
use zonemux_infrastructure::builtin_plugins;

pub fn load_config(path: &Path, cli_overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, cli_overrides)?;
    config.validate()?;
    Ok(config)
}

/// Expand the server blocks of `config` with the built-in plugins and key
/// enhancers.
pub fn inspect_server_blocks(config: &Config) -> anyhow::Result<Vec<Arc<ServerConfig>>> {
    let use_case = InspectServerBlocksUseCase::new(
        Arc::new(KeyEnhancerRegistry::with_builtins()),
        Arc::new(builtin_plugins()),
    );
    let configs = use_case.execute(config)?;

    info!(
        blocks = config.servers.len(),
        zones = configs.len(),
        "Configuration loaded"
    );
    Ok(configs)
}
