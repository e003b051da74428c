//! The set of listeners built from one configuration load.

mod banner;

pub use banner::banner;

use anyhow::Context;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument};
use zonemux_application::services::ServerConfig;
use zonemux_infrastructure::{group_by_listen_address, DnsServer, ServerMetrics};

/// Every server of one configuration generation.
///
/// A reload builds and starts a new set before the old one stops; sockets
/// use `SO_REUSEPORT`, so both generations can hold the same addresses for
/// the overlap.
pub struct ServerSet {
    configs: Vec<Arc<ServerConfig>>,
    servers: Vec<DnsServer>,
}

impl ServerSet {
    pub fn build(
        configs: Vec<Arc<ServerConfig>>,
        metrics: Arc<ServerMetrics>,
    ) -> anyhow::Result<Self> {
        let groups = group_by_listen_address(&configs)?;
        let mut servers = Vec::with_capacity(groups.len());
        for (address, group) in groups {
            let server = DnsServer::new(&address, &group, metrics.clone())
                .with_context(|| format!("cannot set up {address}"))?;
            servers.push(server);
        }
        Ok(Self { configs, servers })
    }

    pub fn configs(&self) -> &[Arc<ServerConfig>] {
        &self.configs
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Start every server. If one fails, those already started are stopped
    /// again before the error is returned.
    #[instrument(skip(self), fields(servers = self.servers.len()))]
    pub async fn start(&self) -> anyhow::Result<()> {
        for (index, server) in self.servers.iter().enumerate() {
            if let Err(e) = server.start().await {
                join_all(self.servers[..index].iter().map(DnsServer::stop)).await;
                return Err(e).with_context(|| format!("cannot start {}", server.address()));
            }
        }
        Ok(())
    }

    pub async fn stop(&self) {
        join_all(self.servers.iter().map(DnsServer::stop)).await;
        info!(servers = self.servers.len(), "All servers stopped");
    }
}
