//! Prometheus counters for the publication API
//!
//! Exposed as text on GET /metrics when `daemon.metrics` is on.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    pub publications: Counter,
    pub accesses: Counter,
    pub access_denials: Counter,
    pub integrity_failures: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("pubseal");

        let publications = Counter::default();
        registry.register(
            "publications",
            "Files published successfully",
            publications.clone(),
        );
        let accesses = Counter::default();
        registry.register(
            "accesses",
            "Successful decrypting accesses",
            accesses.clone(),
        );
        let access_denials = Counter::default();
        registry.register(
            "access_denials",
            "Access attempts refused for an unknown id or a wrong secret",
            access_denials.clone(),
        );
        let integrity_failures = Counter::default();
        registry.register(
            "integrity_failures",
            "Ciphertext that failed authentication or hash verification",
            integrity_failures.clone(),
        );

        Self {
            registry,
            publications,
            accesses,
            access_denials,
            integrity_failures,
        }
    }

    /// Render every counter in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
