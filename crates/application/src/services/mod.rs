pub mod compiled;
pub mod key_enhancers;
pub mod multiplexer;
pub mod plugin_chain;
pub mod plugin_registry;
pub mod replies;
pub mod scrub;
pub mod server_config;
pub mod settings;

pub use compiled::{CompiledConfig, CHAOS_PLUGINS, TRACE_PLUGIN};
pub use key_enhancers::{BindEnhancer, KeyEnhancerRegistry};
pub use multiplexer::{Multiplexer, DROPPED_ZONE};
pub use plugin_chain::{DsoChain, DsoNext, Next, PluginChain};
pub use plugin_registry::PluginRegistry;
pub use scrub::{fit_reply, ScrubWriter};
pub use server_config::{PluginSpec, ServerConfig, Timeouts, TlsFiles};
pub use settings::ServerSettings;
