use dashmap::DashMap;
use hickory_proto::op::ResponseCode;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use zonemux_application::ports::QueryMetrics;

/// Process-wide query counters, shared by every server.
///
/// Counters only ever grow; a reload keeps the same instance so totals
/// survive configuration changes.
#[derive(Default)]
pub struct ServerMetrics {
    requests: AtomicU64,
    panics: AtomicU64,
    /// Error replies by (zone, rcode)
    error_replies: DashMap<(String, u16), u64>,
}

/// Point-in-time copy of [`ServerMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub panics: u64,
    /// Keyed by zone then response code name, e.g. `("dropped", "Refused")`.
    pub error_replies: BTreeMap<(String, String), u64>,
}

impl MetricsSnapshot {
    pub fn error_replies_for(&self, zone: &str) -> u64 {
        self.error_replies
            .iter()
            .filter(|((z, _), _)| z == zone)
            .map(|(_, count)| count)
            .sum()
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let error_replies = self
            .error_replies
            .iter()
            .map(|entry| {
                let (zone, rcode) = entry.key();
                let name = format!("{:?}", <ResponseCode as From<u16>>::from(*rcode));
                ((zone.clone(), name), *entry.value())
            })
            .collect();

        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            error_replies,
        }
    }
}

impl QueryMetrics for ServerMetrics {
    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error_reply(&self, zone: &str, rcode: ResponseCode) {
        self.error_replies
            .entry((zone.to_string(), u16::from(rcode)))
            .and_modify(|c| *c += 1)
            .or_insert(1);
    }
}
