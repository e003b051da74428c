use crate::errors::DomainError;
use crate::tsig::{TsigAlgorithm, TsigKey};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `[[server]]` block.
///
/// Every zone key in `zones` shares the block's plugins, TSIG keys and
/// timeouts. Timeouts of zero mean "not set" and leave the listener default
/// (or a sibling block's value) in place.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerBlockConfig {
    /// Zone keys, e.g. "example.org", "tls://example.net:8853", "10.0.0.0/24"
    pub zones: Vec<String>,

    /// Disable panic recovery and log every query outcome
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub grace_timeout_secs: u64,

    #[serde(default)]
    pub read_timeout_secs: u64,

    #[serde(default)]
    pub write_timeout_secs: u64,

    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// PEM certificate chain for tls:// zones
    #[serde(default)]
    pub tls_cert: Option<String>,

    /// PEM private key for tls:// zones
    #[serde(default)]
    pub tls_key: Option<String>,

    /// Key enhancers by name with their parameters, e.g. `bind = ["127.0.0.1"]`
    #[serde(default)]
    pub enhancers: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub tsig: Vec<TsigKeyConfig>,

    /// Plugins in execution order
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

/// A TSIG key with a base64 encoded secret
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TsigKeyConfig {
    pub name: String,

    #[serde(default = "default_tsig_algorithm")]
    pub algorithm: String,

    pub secret: String,
}

impl TsigKeyConfig {
    pub fn to_key(&self) -> Result<TsigKey, DomainError> {
        let invalid = |reason: String| DomainError::InvalidTsigKey {
            name: self.name.clone(),
            reason,
        };

        let algorithm: TsigAlgorithm = self
            .algorithm
            .parse()
            .map_err(|_| invalid(format!("unsupported algorithm {}", self.algorithm)))?;
        let secret = STANDARD
            .decode(self.secret.trim())
            .map_err(|e| invalid(format!("secret is not valid base64: {e}")))?;
        if secret.is_empty() {
            return Err(invalid("secret is empty".to_string()));
        }

        Ok(TsigKey::new(&self.name, algorithm, secret))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    pub name: String,

    #[serde(default)]
    pub args: Vec<String>,
}

fn default_tsig_algorithm() -> String {
    "hmac-sha256".to_string()
}
