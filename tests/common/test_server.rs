use std::net::SocketAddr;
use std::sync::Arc;
use zonemux_application::services::KeyEnhancerRegistry;
use zonemux_application::use_cases::InspectServerBlocksUseCase;
use zonemux_domain::Config;
use zonemux_infrastructure::{builtin_plugins, group_by_listen_address, DnsServer, ServerMetrics};

/// Servers built from a TOML snippet through the same path the binary uses.
pub struct TestServer {
    servers: Vec<DnsServer>,
    addrs: Vec<Vec<SocketAddr>>,
    pub metrics: Arc<ServerMetrics>,
}

impl TestServer {
    pub async fn start(toml: &str) -> Self {
        let config = Config::from_toml_str(toml).expect("valid toml");
        config.validate().expect("valid config");
        let configs = InspectServerBlocksUseCase::new(
            Arc::new(KeyEnhancerRegistry::with_builtins()),
            Arc::new(builtin_plugins()),
        )
        .execute(&config)
        .expect("server blocks");

        let metrics = Arc::new(ServerMetrics::new());
        let mut servers = Vec::new();
        let mut addrs = Vec::new();
        for (address, group) in group_by_listen_address(&configs).expect("grouping") {
            let server = DnsServer::new(&address, &group, metrics.clone()).expect("server");
            addrs.push(server.start().await.expect("start"));
            servers.push(server);
        }

        Self {
            servers,
            addrs,
            metrics,
        }
    }

    /// Datagram address of the first server.
    pub fn udp_addr(&self) -> SocketAddr {
        self.addrs[0][0]
    }

    /// Stream address of the first server.
    pub fn tcp_addr(&self) -> SocketAddr {
        *self.addrs[0].last().expect("stream listener")
    }

    pub fn server(&self) -> &DnsServer {
        &self.servers[0]
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub async fn stop(&self) {
        for server in &self.servers {
            server.stop().await;
        }
    }
}
