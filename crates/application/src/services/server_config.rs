use crate::ports::{FilterFn, PluginFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use zonemux_domain::{TsigKey, Transport, ZoneAddress};

/// Timeout overrides of one server block; `None` keeps the listener value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub grace: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub idle: Option<Duration>,
}

impl Timeouts {
    /// Build from config seconds, where zero means unset.
    pub fn from_secs(grace: u64, read: u64, write: u64, idle: u64) -> Self {
        let set = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            grace: set(grace),
            read: set(read),
            write: set(write),
            idle: set(idle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: String,
    pub key: String,
}

/// A plugin to instantiate, with its arguments.
#[derive(Clone)]
pub struct PluginSpec {
    pub factory: Arc<dyn PluginFactory>,
    pub args: Vec<String>,
}

impl PluginSpec {
    pub fn new(factory: Arc<dyn PluginFactory>, args: Vec<String>) -> Self {
        Self { factory, args }
    }

    pub fn name(&self) -> &str {
        self.factory.name()
    }
}

/// Everything configured for one zone on one port and transport.
///
/// Shared behind an `Arc`; listeners are grouped by the hosts this config
/// binds and the `Arc` is what ends up in each group.
#[derive(Clone)]
pub struct ServerConfig {
    /// Zone, transport, port, reverse CIDR and options. The listening host
    /// is always empty; hosts live in `listen_hosts`.
    pub address: ZoneAddress,
    /// Hosts to bind. Empty binds the wildcard address.
    pub listen_hosts: Vec<String>,
    pub debug: bool,
    pub timeouts: Timeouts,
    pub tsig_keys: Vec<TsigKey>,
    pub tls: Option<TlsFiles>,
    pub filters: Vec<FilterFn>,
    pub plugins: Vec<PluginSpec>,
}

impl ServerConfig {
    pub fn new(address: ZoneAddress) -> Self {
        Self {
            address: address.multicast_projection(),
            listen_hosts: Vec::new(),
            debug: false,
            timeouts: Timeouts::default(),
            tsig_keys: Vec::new(),
            tls: None,
            filters: Vec::new(),
            plugins: Vec::new(),
        }
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.listen_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_plugin(mut self, factory: Arc<dyn PluginFactory>, args: Vec<String>) -> Self {
        self.plugins.push(PluginSpec::new(factory, args));
        self
    }

    pub fn with_filter(mut self, filter: FilterFn) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn zone(&self) -> &str {
        &self.address.zone
    }

    pub fn transport(&self) -> Transport {
        self.address.transport
    }

    pub fn port(&self) -> u16 {
        self.address.port
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(PluginSpec::name).collect();
        f.debug_struct("ServerConfig")
            .field("address", &self.address.as_key())
            .field("listen_hosts", &self.listen_hosts)
            .field("debug", &self.debug)
            .field("timeouts", &self.timeouts)
            .field("tsig_keys", &self.tsig_keys)
            .field("filters", &self.filters.len())
            .field("plugins", &plugins)
            .finish()
    }
}
