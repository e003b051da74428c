use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tracing::debug;
use zonemux_application::services::ServerConfig;
use zonemux_domain::DomainError;

/// Group server configs by the socket they listen on.
///
/// Keys have the form `transport://addr`, where `addr` is `:port` for the
/// wildcard host and a resolved socket address otherwise (`[v6]:port` for
/// IPv6). A config listening on several hosts lands in several groups.
/// Groups keep declaration order; resolution failures abort grouping.
pub fn group_by_listen_address(
    configs: &[Arc<ServerConfig>],
) -> Result<BTreeMap<String, Vec<Arc<ServerConfig>>>, DomainError> {
    let mut groups: BTreeMap<String, Vec<Arc<ServerConfig>>> = BTreeMap::new();

    for config in configs {
        let wildcard = [String::new()];
        let hosts: &[String] = if config.listen_hosts.is_empty() {
            &wildcard
        } else {
            &config.listen_hosts
        };

        // Two hosts may resolve to the same socket.
        let mut keys = FxHashSet::default();
        for host in hosts {
            let addr = listen_address(host, config.port())?;
            let key = format!("{}{}", config.transport().scheme(), addr);
            if keys.insert(key.clone()) {
                groups.entry(key).or_default().push(Arc::clone(config));
            }
        }
    }

    debug!(groups = groups.len(), "grouped server configs by listen address");
    Ok(groups)
}

fn listen_address(host: &str, port: u16) -> Result<String, DomainError> {
    if host.is_empty() {
        return Ok(format!(":{port}"));
    }
    let resolved: SocketAddr = (host, port)
        .to_socket_addrs()
        .map_err(|e| DomainError::AddressResolution {
            addr: host.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| DomainError::AddressResolution {
            addr: host.to_string(),
            reason: "no addresses found".to_string(),
        })?;
    Ok(resolved.to_string())
}
