use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use zonemux_application::services::ServerConfig;
use zonemux_domain::validators::is_preferred_hostname;
use zonemux_domain::zone_address::bracket_host;

/// Startup listing of the served zones.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Banner {
    /// `scheme://zone:port[ on host]`, sorted by zone.
    pub lines: Vec<String>,
    /// Zones whose names do not follow the preferred name syntax.
    pub unusual_zones: Vec<String>,
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn banner(configs: &[Arc<ServerConfig>]) -> Banner {
    let mut lines = BTreeSet::new();
    let mut unusual = BTreeSet::new();

    for config in configs {
        let zone = config.zone();
        let base = format!("{}{}:{}", config.transport().scheme(), zone, config.port());
        if config.listen_hosts.is_empty() {
            lines.insert((zone.to_string(), base.clone()));
        }
        for host in &config.listen_hosts {
            lines.insert((zone.to_string(), format!("{base} on {}", bracket_host(host))));
        }

        // Reverse zones carry numeric labels by construction.
        if config.address.reverse_net.is_none() && !is_preferred_hostname(zone) {
            unusual.insert(zone.to_string());
        }
    }

    Banner {
        lines: lines.into_iter().map(|(_, line)| line).collect(),
        unusual_zones: unusual.into_iter().collect(),
    }
}
