//! Plugins compiled into the binary.

mod chaos;
mod log;
mod whoami;

pub use chaos::{Chaos, ChaosFactory};
pub use log::{Log, LogFactory};
pub use whoami::{Whoami, WhoamiFactory};

use std::sync::Arc;
use zonemux_application::services::PluginRegistry;

/// Registry holding every built-in plugin.
pub fn builtin_plugins() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(ChaosFactory));
    registry.register(Arc::new(LogFactory));
    registry.register(Arc::new(WhoamiFactory));
    registry
}
