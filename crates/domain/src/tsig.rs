use crate::errors::DomainError;
use crate::validators::fqdn;
use std::fmt;
use std::str::FromStr;

/// HMAC algorithms accepted for TSIG (RFC 8945 section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsigAlgorithm {
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl TsigAlgorithm {
    /// Canonical algorithm name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "hmac-sha1.",
            Self::HmacSha224 => "hmac-sha224.",
            Self::HmacSha256 => "hmac-sha256.",
            Self::HmacSha384 => "hmac-sha384.",
            Self::HmacSha512 => "hmac-sha512.",
        }
    }
}

impl fmt::Display for TsigAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TsigAlgorithm {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fqdn(s).as_str() {
            "hmac-sha1." => Ok(Self::HmacSha1),
            "hmac-sha224." => Ok(Self::HmacSha224),
            "hmac-sha256." => Ok(Self::HmacSha256),
            "hmac-sha384." => Ok(Self::HmacSha384),
            "hmac-sha512." => Ok(Self::HmacSha512),
            _ => Err(DomainError::InvalidTsigKey {
                name: String::new(),
                reason: format!("unsupported algorithm {s}"),
            }),
        }
    }
}

/// A shared TSIG secret, keyed by owner name.
///
/// `algorithm` is kept as the canonical name string: lookups compare it
/// byte for byte against the algorithm carried by the TSIG record.
#[derive(Clone, PartialEq, Eq)]
pub struct TsigKey {
    pub name: String,
    pub algorithm: String,
    pub secret: Vec<u8>,
}

impl TsigKey {
    pub fn new(name: &str, algorithm: TsigAlgorithm, secret: Vec<u8>) -> Self {
        Self {
            name: fqdn(name),
            algorithm: algorithm.name().to_string(),
            secret,
        }
    }
}

impl fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}
