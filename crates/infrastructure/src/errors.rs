use std::io;
use thiserror::Error;
use zonemux_domain::DomainError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid listen address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS setup for {addr} failed: {reason}")]
    Tls { addr: String, reason: String },

    #[error("Server {0} is already running")]
    AlreadyStarted(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
