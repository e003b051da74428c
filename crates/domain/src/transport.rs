use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire carriage a listener speaks.
///
/// `Dns` is plain DNS over UDP and TCP. `Tls` and `Grpc` are stream-only
/// variants served through the same framing as TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Dns,
    Tls,
    Grpc,
}

impl Transport {
    pub const ALL: [Transport; 3] = [Transport::Dns, Transport::Tls, Transport::Grpc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Tls => "tls",
            Self::Grpc => "grpc",
        }
    }

    /// Prefix used in addresses and bind strings, e.g. `dns://`.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Dns => "dns://",
            Self::Tls => "tls://",
            Self::Grpc => "grpc://",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Dns => 53,
            Self::Tls => 853,
            Self::Grpc => 443,
        }
    }

    /// Whether the transport also listens on a datagram socket.
    pub fn has_datagram(&self) -> bool {
        matches!(self, Self::Dns)
    }

    /// Strip a `scheme://` prefix from `raw`.
    ///
    /// Input without a scheme defaults to [`Transport::Dns`]. An unknown
    /// scheme is an error rather than silently treated as plain DNS.
    pub fn split_prefix(raw: &str) -> Result<(Transport, &str), DomainError> {
        match raw.find("://") {
            None => Ok((Transport::Dns, raw)),
            Some(idx) => {
                let transport = raw[..idx].parse()?;
                Ok((transport, &raw[idx + 3..]))
            }
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dns" => Ok(Self::Dns),
            "tls" => Ok(Self::Tls),
            "grpc" => Ok(Self::Grpc),
            other => Err(DomainError::UnknownTransport(other.to_string())),
        }
    }
}
