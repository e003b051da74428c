use hickory_proto::op::ResponseCode;

/// Counters the query path reports into.
pub trait QueryMetrics: Send + Sync {
    fn record_request(&self);

    fn record_panic(&self);

    /// An error reply written by the server itself. `zone` is `dropped`
    /// when no zone matched.
    fn record_error_reply(&self, zone: &str, rcode: ResponseCode);
}

pub struct NoopMetrics;

impl QueryMetrics for NoopMetrics {
    fn record_request(&self) {}

    fn record_panic(&self) {}

    fn record_error_reply(&self, _zone: &str, _rcode: ResponseCode) {}
}
