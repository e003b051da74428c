use crate::ports::Handler;
use std::sync::Arc;
use zonemux_domain::DomainError;

/// Builds a plugin instance for one server config.
pub trait PluginFactory: Send + Sync {
    fn name(&self) -> &str;

    fn build(&self, args: &[String]) -> Result<Arc<dyn Handler>, DomainError>;
}
