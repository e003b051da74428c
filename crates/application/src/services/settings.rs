use crate::services::server_config::ServerConfig;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use zonemux_domain::TsigKey;

pub const DEFAULT_GRACE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-listener settings merged from every config sharing the address.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub grace_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub debug: bool,
    /// TSIG secrets by key name.
    pub tsig_keys: FxHashMap<String, TsigKey>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grace_timeout: DEFAULT_GRACE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            debug: false,
            tsig_keys: FxHashMap::default(),
        }
    }
}

impl ServerSettings {
    /// Merge in declaration order. Timeouts and TSIG keys: the last config
    /// that sets a value wins. Debug is on if any config turns it on.
    ///
    /// One listener has a single TSIG table, so two zones on the same socket
    /// that define the same key name with different secrets cannot both be
    /// honoured; the later definition replaces the earlier one.
    pub fn merge(group: &[Arc<ServerConfig>]) -> Self {
        let mut settings = Self::default();

        for config in group {
            let t = &config.timeouts;
            if let Some(grace) = t.grace {
                settings.grace_timeout = grace;
            }
            if let Some(read) = t.read {
                settings.read_timeout = read;
            }
            if let Some(write) = t.write {
                settings.write_timeout = write;
            }
            if let Some(idle) = t.idle {
                settings.idle_timeout = idle;
            }
            settings.debug |= config.debug;

            for key in &config.tsig_keys {
                if let Some(previous) = settings.tsig_keys.insert(key.name.clone(), key.clone()) {
                    if previous != *key {
                        warn!(
                            key = %key.name,
                            zone = %config.zone(),
                            "TSIG key redefined for a shared listener, last definition wins"
                        );
                    }
                }
            }
        }

        settings
    }
}
