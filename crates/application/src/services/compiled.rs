use crate::context::RequestContext;
use crate::ports::{FilterFn, Handler};
use crate::request::Request;
use crate::services::plugin_chain::{DsoChain, PluginChain};
use crate::services::server_config::ServerConfig;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;
use zonemux_domain::DomainError;

/// Plugins allowed to answer classes other than IN.
pub const CHAOS_PLUGINS: [&str; 3] = ["chaos", "forward", "proxy"];

/// Name of the plugin exposed through [`CompiledConfig::tracer`].
pub const TRACE_PLUGIN: &str = "trace";

/// A server config with its plugins built and capabilities resolved.
pub struct CompiledConfig {
    pub config: Arc<ServerConfig>,
    /// `None` when the config declares no plugins.
    pub chain: Option<PluginChain>,
    /// `None` unless some plugin handles stateful messages.
    pub dso_chain: Option<DsoChain>,
    pub filters: Vec<FilterFn>,
    pub view: Option<String>,
    pub unblocks_chaos: bool,
    metadata: Option<Arc<dyn Handler>>,
    tracer: Option<Arc<dyn Handler>>,
    registry: FxHashMap<String, Arc<dyn Handler>>,
}

impl CompiledConfig {
    pub fn compile(config: Arc<ServerConfig>) -> Result<Self, DomainError> {
        let mut handlers: Vec<Arc<dyn Handler>> = Vec::with_capacity(config.plugins.len());
        let mut metadata = None;
        let mut tracer = None;
        let mut unblocks_chaos = false;

        // Walk backwards so the first declared plugin is the last assigned.
        for spec in config.plugins.iter().rev() {
            let handler = spec.factory.build(&spec.args)?;

            if handler.as_metadata().is_some() {
                metadata = Some(Arc::clone(&handler));
            }
            if handler.name() == TRACE_PLUGIN {
                tracer = Some(Arc::clone(&handler));
            }
            if CHAOS_PLUGINS.contains(&handler.name()) {
                unblocks_chaos = true;
            }
            handlers.push(handler);
        }
        handlers.reverse();

        let mut filters = config.filters.clone();
        let mut view = None;
        let mut registry = FxHashMap::default();
        for handler in &handlers {
            registry
                .entry(handler.name().to_string())
                .or_insert_with(|| Arc::clone(handler));

            if let Some(v) = handler.as_view() {
                view.get_or_insert_with(|| v.view_name().to_string());
                let owner = Arc::clone(handler);
                filters.push(Arc::new(move |ctx: &RequestContext, req: &Request| {
                    owner.as_view().map_or(true, |v| v.filter(ctx, req))
                }));
            }
        }

        let dso: Vec<Arc<dyn Handler>> = handlers
            .iter()
            .filter(|h| h.as_dso().is_some())
            .cloned()
            .collect();

        debug!(
            zone = %config.zone(),
            plugins = handlers.len(),
            dso = dso.len(),
            "compiled plugin chain"
        );

        Ok(Self {
            chain: (!handlers.is_empty()).then(|| PluginChain::new(handlers)),
            dso_chain: (!dso.is_empty()).then(|| DsoChain::new(dso)),
            filters,
            view,
            unblocks_chaos,
            metadata,
            tracer,
            registry,
            config,
        })
    }

    pub fn collect_metadata(&self, ctx: &mut RequestContext, req: &Request) {
        if let Some(collector) = self.metadata.as_ref().and_then(|h| h.as_metadata()) {
            collector.collect(ctx, req);
        }
    }

    pub fn passes_filters(&self, ctx: &RequestContext, req: &Request) -> bool {
        self.filters.iter().all(|filter| filter(ctx, req))
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn tracer(&self) -> Option<&Arc<dyn Handler>> {
        self.tracer.as_ref()
    }

    /// Plugin instance by name; the first declared wins on duplicates.
    pub fn handler(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.registry.get(name)
    }

    pub fn metadata_plugin(&self) -> Option<&str> {
        self.metadata.as_ref().map(|h| h.name())
    }
}
