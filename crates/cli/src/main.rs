//! # zonemux
//!
//! Authoritative DNS front end: routes each query to the zone that serves
//! it and runs that zone's plugin chain.

mod bootstrap;
mod server;
mod signals;

use anyhow::Context;
use bootstrap::{init_logging, inspect_server_blocks, load_config};
use clap::Parser;
use server::{banner, ServerSet};
use signals::{Event, Signals};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use zonemux_domain::CliOverrides;
use zonemux_infrastructure::{builtin_plugins, ServerMetrics};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "zonemux")]
#[command(version)]
#[command(about = "Zone-multiplexing DNS server")]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, default_value = "zonemux.toml")]
    conf: PathBuf,

    /// Do not print the zone listing at startup
    #[arg(short = 'q', long)]
    quiet: bool,

    /// List the built-in plugins and exit
    #[arg(long)]
    plugins: bool,

    /// Load and check the configuration, then exit
    #[arg(long)]
    validate: bool,

    /// Log level or filter directive, overrides [logging].level
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.plugins {
        let registry = builtin_plugins();
        let mut names: Vec<&str> = registry.names().collect();
        names.sort_unstable();
        println!("Server types:\n  dns\n\nPlugins:");
        for name in names {
            println!("  {name}");
        }
        return Ok(());
    }

    let config = load_config(&cli.conf, cli.overrides())
        .with_context(|| format!("cannot load {}", cli.conf.display()))?;
    init_logging(&config.logging)?;
    let configs = inspect_server_blocks(&config)?;

    if cli.validate {
        println!("{}: OK, {} zone configs", cli.conf.display(), configs.len());
        return Ok(());
    }

    let metrics = Arc::new(ServerMetrics::new());
    let mut current = ServerSet::build(configs, metrics.clone())?;
    current.start().await?;
    announce(&current, cli.quiet);
    info!(servers = current.server_count(), version = env!("CARGO_PKG_VERSION"), "zonemux ready");

    let mut signals = Signals::new().context("cannot install signal handlers")?;
    loop {
        match signals.recv().await {
            Event::Stop => break,
            Event::Reload => match reload(&cli.conf, cli.overrides(), &metrics).await {
                Ok(next) => {
                    current.stop().await;
                    current = next;
                    announce(&current, cli.quiet);
                    info!(servers = current.server_count(), "Configuration reloaded");
                }
                Err(e) => {
                    error!(error = ?e, "Reload failed, keeping current servers");
                }
            },
        }
    }

    info!("Shutting down");
    current.stop().await;

    let totals = metrics.snapshot();
    info!(
        requests = totals.requests,
        panics = totals.panics,
        error_replies = totals.error_replies.values().sum::<u64>(),
        "Served"
    );
    Ok(())
}

/// Build and start the servers of a fresh configuration load. The caller
/// stops the old generation only once this succeeded.
async fn reload(
    path: &Path,
    overrides: CliOverrides,
    metrics: &Arc<ServerMetrics>,
) -> anyhow::Result<ServerSet> {
    info!(path = %path.display(), "Reloading configuration");
    let config = load_config(path, overrides)?;
    let configs = inspect_server_blocks(&config)?;
    let next = ServerSet::build(configs, metrics.clone())?;
    next.start().await?;
    Ok(next)
}

fn announce(set: &ServerSet, quiet: bool) {
    let listing = banner(set.configs());
    for zone in &listing.unusual_zones {
        warn!(zone = %zone, "Zone name does not follow the preferred name syntax");
    }
    if !quiet {
        print!("{listing}");
    }
}
