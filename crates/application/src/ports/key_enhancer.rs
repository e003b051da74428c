use zonemux_domain::{DomainError, ZoneAddress};

/// Rewrites a parsed zone address before overlap validation.
///
/// Enhancers may fan one address out into several, for example one per
/// listen host. They run once per configuration load.
pub trait KeyEnhancer: Send + Sync {
    fn name(&self) -> &str;

    fn enhance(
        &self,
        addr: ZoneAddress,
        params: &[String],
    ) -> Result<Vec<ZoneAddress>, DomainError>;
}
