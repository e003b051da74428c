use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zonemux_domain::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.with_ansi(true).try_init()
    };
    installed.map_err(|e| anyhow!(e))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
