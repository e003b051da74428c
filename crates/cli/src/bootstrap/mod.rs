pub mod config;
pub mod logging;

pub use config::{inspect_server_blocks, load_config};
pub use logging::init_logging;
