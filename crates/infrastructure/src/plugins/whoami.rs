use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, SRV};
use hickory_proto::rr::{Name, RData, Record};
use std::net::IpAddr;
use std::sync::Arc;
use zonemux_application::ports::{Handler, PluginFactory, ResponseWriter};
use zonemux_application::services::replies::response_for;
use zonemux_application::services::Next;
use zonemux_application::{PluginError, Request, RequestContext};
use zonemux_domain::DomainError;

pub const NAME: &str = "whoami";

/// Answers any query with the address the client connected from.
///
/// The answer is an A or AAAA record for the question name; the additional
/// section carries an SRV record under `_udp.` or `_tcp.` whose port is the
/// client's source port.
pub struct Whoami;

#[async_trait]
impl Handler for Whoami {
    fn name(&self) -> &str {
        NAME
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        let Some(msg) = req.message() else {
            return Ok(ResponseCode::NotImp);
        };
        let Some(question) = msg.queries().first() else {
            return Ok(ResponseCode::FormErr);
        };
        let name = question.name().clone();

        let rdata = match req.remote.ip() {
            IpAddr::V4(ip) => RData::A(A(ip)),
            IpAddr::V6(ip) => RData::AAAA(AAAA(ip)),
        };
        let srv_name = Name::from_ascii(format!("_{}", req.protocol))
            .and_then(|label| label.append_domain(&name))
            .map_err(|e| PluginError::failed(NAME, e.to_string()))?;

        let mut reply = response_for(msg);
        reply.set_authoritative(true);
        reply.add_answer(Record::from_rdata(name.clone(), 0, rdata));
        reply.add_additional(Record::from_rdata(
            srv_name,
            0,
            RData::SRV(SRV::new(0, 0, req.remote.port(), name)),
        ));

        w.write_msg(reply).await?;
        Ok(ResponseCode::NoError)
    }
}

pub struct WhoamiFactory;

impl PluginFactory for WhoamiFactory {
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
        Ok(Arc::new(Whoami))
    }
}
