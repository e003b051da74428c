use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use zonemux_application::ports::{Handler, PluginFactory, ResponseWriter};
use zonemux_application::services::Next;
use zonemux_application::{PluginError, Request, RequestContext};
use zonemux_domain::DomainError;

pub const NAME: &str = "log";

/// Logs every query and the code the rest of the chain returned.
pub struct Log;

#[async_trait]
impl Handler for Log {
    fn name(&self) -> &str {
        NAME
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        let started = Instant::now();
        let result = next.serve_dns(ctx, w, req).await;

        let qtype = req.qtype().map(|t| t.to_string()).unwrap_or_default();
        let rcode = match &result {
            Ok(rcode) => *rcode,
            Err(e) => e.rcode(),
        };
        info!(
            client = %req.remote,
            proto = %req.protocol,
            id = req.id(),
            zone = %ctx.zone,
            qname = %req.qname(),
            qtype = %qtype,
            rcode = %rcode,
            elapsed_us = started.elapsed().as_micros() as u64,
            "query"
        );
        result
    }
}

pub struct LogFactory;

impl PluginFactory for LogFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, args: &[String]) -> Result<Arc<dyn Handler>, DomainError> {
        if !args.is_empty() {
            return Err(DomainError::PluginSetup {
                name: NAME.to_string(),
                reason: "takes no arguments".to_string(),
            });
        }
        Ok(Arc::new(Log))
    }
}
