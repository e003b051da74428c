//! DNS Stateful Operations (RFC 8490).
//!
//! DSO messages share the 12-byte DNS header (opcode 6, all section counts
//! zero) and carry their payload as type-length-value records instead of
//! resource records. The server keeps one [`DsoSession`] per stream
//! connection that has sent a stateful message.

mod codec;
mod registry;
mod session;

pub use codec::{opcode, DsoMessage, DsoTlv, DSO_OPCODE};
pub use registry::DsoSessions;
pub use session::{DsoSession, DsoState, KeepAlive, MIN_KEEPALIVE_INTERVAL};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsoError {
    /// The session is not in a state that allows this message.
    #[error("DSO session in wrong state for this message")]
    BadState,

    #[error("DSO session is closed")]
    Closed,

    #[error("cannot encode DSO message: {0}")]
    Encode(String),

    #[error("malformed DSO message: {0}")]
    Malformed(String),

    #[error("DSO write failed: {0}")]
    Io(#[from] std::io::Error),
}
