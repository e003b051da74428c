use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use std::sync::Arc;
use zonemux_application::ports::{Handler, PluginFactory, ResponseWriter};
use zonemux_application::services::replies::response_for;
use zonemux_application::services::Next;
use zonemux_application::{PluginError, Request, RequestContext};
use zonemux_domain::DomainError;

pub const NAME: &str = "chaos";

/// Answers the CHAOS-class identification queries (RFC 4892).
///
/// `version.bind` and `version.server` return the configured version,
/// `authors.bind` the configured authors, `hostname.bind` and `id.server`
/// the local host name. Everything else goes down the chain.
pub struct Chaos {
    version: String,
    authors: Vec<String>,
    hostname: String,
}

impl Chaos {
    pub fn new(version: impl Into<String>, authors: Vec<String>) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        Self {
            version: version.into(),
            authors,
            hostname,
        }
    }

    fn answer_for(&self, qname: &str) -> Option<Vec<String>> {
        match qname {
            "version.bind." | "version.server." => Some(vec![self.version.clone()]),
            "authors.bind." if !self.authors.is_empty() => Some(self.authors.clone()),
            "hostname.bind." | "id.server." => Some(vec![self.hostname.clone()]),
            _ => None,
        }
    }
}

#[async_trait]
impl Handler for Chaos {
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
        let Some(msg) = req.message() else {
            return next.serve_dns(ctx, w, req).await;
        };
        if req.qclass() != Some(DNSClass::CH) || req.qtype() != Some(RecordType::TXT) {
            return next.serve_dns(ctx, w, req).await;
        }
        let Some(strings) = self.answer_for(&req.qname()) else {
            return next.serve_dns(ctx, w, req).await;
        };
        let Some(question) = msg.queries().first() else {
            return next.serve_dns(ctx, w, req).await;
        };

        let mut reply = response_for(msg);
        reply.set_authoritative(true);
        let mut record = Record::from_rdata(question.name().clone(), 0, RData::TXT(TXT::new(strings)));
        record.set_dns_class(DNSClass::CH);
        reply.add_answer(record);

        w.write_msg(reply).await?;
        Ok(ResponseCode::NoError)
    }
}

/// `chaos [version] [author...]`; the version defaults to the crate's.
pub struct ChaosFactory;

impl PluginFactory for ChaosFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, args: &[String]) -> Result<Arc<dyn Handler>, DomainError> {
        let (version, authors) = match args.split_first() {
            Some((version, authors)) => (version.clone(), authors.to_vec()),
            None => (
                format!("zonemux-{}", env!("CARGO_PKG_VERSION")),
                Vec::new(),
            ),
        };
        Ok(Arc::new(Chaos::new(version, authors)))
    }
}
