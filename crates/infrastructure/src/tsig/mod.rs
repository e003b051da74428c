//! Transaction signatures (RFC 8945).
//!
//! Keys are matched by exact owner name and exact algorithm name. A request
//! signed with a known key name but a different algorithm fails key lookup;
//! it never falls back to another key. Parsing and emitting the TSIG
//! record goes through hickory; only the HMAC is computed here.

mod provider;

pub use provider::TsigProvider;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsigError {
    #[error("TSIG key {name} with algorithm {algorithm} not found")]
    KeyNotFound { name: String, algorithm: String },

    #[error("Unsupported TSIG algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("TSIG signature mismatch for key {0}")]
    BadSignature(String),

    #[error("TSIG time for key {0} outside the fudge window")]
    BadTime(String),

    #[error("Malformed TSIG record: {0}")]
    Malformed(String),
}
