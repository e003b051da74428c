use crate::context::RequestContext;
use crate::ports::FilterFn;
use crate::request::Request;
use crate::services::{
    KeyEnhancerRegistry, PluginRegistry, PluginSpec, ServerConfig, Timeouts, TlsFiles,
};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use zonemux_domain::config::{ServerBlockConfig, TsigKeyConfig};
use zonemux_domain::{Config, DomainError, OverlapValidator, ZoneAddress};

/// Expands the `[[server]]` blocks of a configuration into server configs.
///
/// Every zone key is normalized, passed through the block's key enhancers
/// and checked for duplicate or overlapping binds against everything seen
/// so far in this load. Any error aborts the whole load.
pub struct InspectServerBlocksUseCase {
    enhancers: Arc<KeyEnhancerRegistry>,
    plugins: Arc<PluginRegistry>,
}

impl InspectServerBlocksUseCase {
    pub fn new(enhancers: Arc<KeyEnhancerRegistry>, plugins: Arc<PluginRegistry>) -> Self {
        Self { enhancers, plugins }
    }

    #[instrument(skip_all, fields(blocks = config.servers.len()))]
    pub fn execute(&self, config: &Config) -> Result<Vec<Arc<ServerConfig>>, DomainError> {
        let mut validator = OverlapValidator::new();
        let mut configs = Vec::new();

        for block in &config.servers {
            self.inspect_block(block, &mut validator, &mut configs)?;
        }

        info!(
            configs = configs.len(),
            binds = validator.len(),
            "Server blocks inspected"
        );
        Ok(configs)
    }

    fn inspect_block(
        &self,
        block: &ServerBlockConfig,
        validator: &mut OverlapValidator,
        configs: &mut Vec<Arc<ServerConfig>>,
    ) -> Result<(), DomainError> {
        let plugins = block
            .plugins
            .iter()
            .map(|p| Ok(PluginSpec::new(self.plugins.get(&p.name)?, p.args.clone())))
            .collect::<Result<Vec<_>, DomainError>>()?;
        let tsig_keys = block
            .tsig
            .iter()
            .map(TsigKeyConfig::to_key)
            .collect::<Result<Vec<_>, _>>()?;
        let tls = match (&block.tls_cert, &block.tls_key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => None,
        };
        let timeouts = Timeouts::from_secs(
            block.grace_timeout_secs,
            block.read_timeout_secs,
            block.write_timeout_secs,
            block.idle_timeout_secs,
        );

        let mut seen = FxHashSet::default();
        for raw in &block.zones {
            let addr = ZoneAddress::normalize_zone(raw)?;
            if !seen.insert(addr.as_key()) {
                return Err(DomainError::DuplicateZone {
                    zone: addr.to_string(),
                });
            }

            let mut expanded = vec![addr];
            for (name, params) in &block.enhancers {
                expanded = self.enhancers.apply(name, params, expanded)?;
            }

            for addr in &expanded {
                let check = validator.register_and_check(addr);
                if check.same {
                    return Err(DomainError::DuplicateBind {
                        zone: addr.to_string(),
                        existing: addr.as_key(),
                    });
                }
                if check.overlap {
                    return Err(DomainError::OverlappingBind {
                        zone: addr.to_string(),
                        existing: check.overlap_key,
                    });
                }
            }

            for (address, hosts) in group_hosts(expanded) {
                let mut config = ServerConfig::new(address).with_hosts(hosts);
                config.debug = block.debug;
                config.timeouts = timeouts;
                config.tsig_keys = tsig_keys.clone();
                config.tls = tls.clone();
                config.plugins = plugins.clone();
                if config.address.reverse_net.is_some() {
                    config.filters.push(reverse_filter(config.address.clone()));
                }

                debug!(
                    address = %config.address,
                    hosts = ?config.listen_hosts,
                    plugins = config.plugins.len(),
                    "server config built"
                );
                configs.push(Arc::new(config));
            }
        }

        Ok(())
    }
}

/// Collapse addresses that differ only in listening host.
fn group_hosts(addrs: Vec<ZoneAddress>) -> Vec<(ZoneAddress, Vec<String>)> {
    let mut groups: Vec<(String, ZoneAddress, Vec<String>)> = Vec::new();
    for addr in addrs {
        let projection = addr.multicast_projection();
        let key = projection.as_key();
        let index = match groups.iter().position(|(k, _, _)| *k == key) {
            Some(index) => index,
            None => {
                groups.push((key, projection, Vec::new()));
                groups.len() - 1
            }
        };
        if !addr.listening_host.is_empty() {
            groups[index].2.push(addr.listening_host);
        }
    }
    groups
        .into_iter()
        .map(|(_, addr, hosts)| (addr, hosts))
        .collect()
}

/// Accept only reverse queries for addresses inside the zone's CIDR.
fn reverse_filter(address: ZoneAddress) -> FilterFn {
    Arc::new(move |_: &RequestContext, req: &Request| address.reverse_contains(&req.qname()))
}
