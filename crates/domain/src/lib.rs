//! zonemux Domain Layer
pub mod config;
pub mod errors;
pub mod overlap;
pub mod reverse;
pub mod transport;
pub mod tsig;
pub mod validators;
pub mod zone_address;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use overlap::{OverlapCheck, OverlapValidator};
pub use transport::Transport;
pub use tsig::{TsigAlgorithm, TsigKey};
pub use zone_address::ZoneAddress;
