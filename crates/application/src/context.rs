use crate::dso::DsoSession;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-query state handed down the plugin chain.
#[derive(Default, Clone)]
pub struct RequestContext {
    /// Zone of the server config that is serving the query.
    pub zone: String,
    /// View tag of that config, when it declares one.
    pub view: Option<String>,
    /// Session of the connection, for stateful messages.
    pub dso: Option<Arc<DsoSession>>,
    metadata: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata_keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }
}
