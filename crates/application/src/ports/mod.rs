pub mod handler;
pub mod key_enhancer;
pub mod metrics;
pub mod plugin_factory;
pub mod response_writer;

pub use handler::{DsoHandler, FilterFn, Handler, MetadataCollector, View};
pub use key_enhancer::KeyEnhancer;
pub use metrics::{NoopMetrics, QueryMetrics};
pub use plugin_factory::PluginFactory;
pub use response_writer::{ConnectionInfo, ResponseWriter};
