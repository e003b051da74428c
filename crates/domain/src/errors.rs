use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid zone '{zone}': {reason}")]
    InvalidZone { zone: String, reason: String },

    #[error("Unknown transport: {0}")]
    UnknownTransport(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid listen address: {0}")]
    InvalidHost(String),

    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("Invalid zone address key: {0}")]
    InvalidKey(String),

    #[error("Cannot resolve listen address {addr}: {reason}")]
    AddressResolution { addr: String, reason: String },

    #[error("Zone {zone} declared more than once in the same server block")]
    DuplicateZone { zone: String },

    #[error("Cannot serve {zone}: it is already defined as {existing}")]
    DuplicateBind { zone: String, existing: String },

    #[error("Cannot serve {zone}: listen address conflicts with {existing}")]
    OverlappingBind { zone: String, existing: String },

    #[error("Key enhancer '{name}' failed: {reason}")]
    KeyEnhancer { name: String, reason: String },

    #[error("Unknown key enhancer: {0}")]
    UnknownKeyEnhancer(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Plugin '{name}' setup failed: {reason}")]
    PluginSetup { name: String, reason: String },

    #[error("Invalid TSIG key '{name}': {reason}")]
    InvalidTsigKey { name: String, reason: String },
}

impl DomainError {
    pub fn invalid_zone(zone: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidZone {
            zone: zone.into(),
            reason: reason.into(),
        }
    }
}
