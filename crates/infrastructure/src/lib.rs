pub mod errors;
pub mod grouping;
pub mod metrics;
pub mod plugins;
pub mod server;
pub mod tsig;

pub use errors::ServerError;
pub use grouping::group_by_listen_address;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use plugins::builtin_plugins;
pub use server::DnsServer;
pub use tsig::{TsigError, TsigProvider};
