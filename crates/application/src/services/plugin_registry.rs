use crate::ports::PluginFactory;
use std::collections::BTreeMap;
use std::sync::Arc;
use zonemux_domain::DomainError;

/// Plugin factories known to the binary, by name.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    factories: BTreeMap<String, Arc<dyn PluginFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn PluginFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn PluginFactory>, DomainError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::UnknownPlugin(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
