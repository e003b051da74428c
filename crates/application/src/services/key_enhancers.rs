use crate::ports::KeyEnhancer;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use zonemux_domain::{DomainError, ZoneAddress};

/// Key enhancers available to a configuration load, by name.
#[derive(Default, Clone)]
pub struct KeyEnhancerRegistry {
    enhancers: BTreeMap<String, Arc<dyn KeyEnhancer>>,
}

impl KeyEnhancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `bind` enhancer.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BindEnhancer));
        registry
    }

    /// Add `enhancer`, replacing one registered under the same name.
    pub fn register(&mut self, enhancer: Arc<dyn KeyEnhancer>) {
        self.enhancers
            .insert(enhancer.name().to_string(), enhancer);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn KeyEnhancer>> {
        self.enhancers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.enhancers.keys().map(String::as_str)
    }

    /// Run the named enhancer over every address in `addrs`.
    pub fn apply(
        &self,
        name: &str,
        params: &[String],
        addrs: Vec<ZoneAddress>,
    ) -> Result<Vec<ZoneAddress>, DomainError> {
        let enhancer = self
            .get(name)
            .ok_or_else(|| DomainError::UnknownKeyEnhancer(name.to_string()))?;

        let mut out = Vec::with_capacity(addrs.len());
        for addr in addrs {
            out.extend(enhancer.enhance(addr, params)?);
        }
        Ok(out)
    }
}

/// Restricts an address to the listed interfaces, one copy per host.
pub struct BindEnhancer;

impl KeyEnhancer for BindEnhancer {
    fn name(&self) -> &str {
        "bind"
    }

    fn enhance(
        &self,
        addr: ZoneAddress,
        params: &[String],
    ) -> Result<Vec<ZoneAddress>, DomainError> {
        let fail = |reason: String| DomainError::KeyEnhancer {
            name: self.name().to_string(),
            reason,
        };

        if params.is_empty() {
            return Err(fail("at least one address is required".to_string()));
        }

        params
            .iter()
            .map(|host| {
                let bare = host.trim_start_matches('[').trim_end_matches(']');
                let ip: IpAddr = bare
                    .parse()
                    .map_err(|_| fail(format!("not an IP address: {host}")))?;
                Ok(addr.clone().with_host(ip.to_string()))
            })
            .collect()
    }
}
