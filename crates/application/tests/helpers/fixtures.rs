use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, NS};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zonemux_application::dso::{DsoMessage, DsoTlv};
use zonemux_application::ports::{
    DsoHandler, Handler, MetadataCollector, PluginFactory, QueryMetrics, ResponseWriter, View,
};
use zonemux_application::services::replies::response_for;
use zonemux_application::services::{DsoNext, Next, ServerConfig};
use zonemux_application::{PluginError, Protocol, Request, RequestContext};
use zonemux_domain::{DomainError, ZoneAddress};

// ============================================================================
// Queries
// ============================================================================

pub fn query(name: &str, rtype: RecordType) -> Message {
    let mut msg = Message::new(0x1234, MessageType::Query, OpCode::Query);
    msg.set_recursion_desired(true);
    msg.add_query(Query::query(Name::from_str(name).unwrap(), rtype));
    msg
}

pub fn chaos_query(name: &str) -> Message {
    let mut msg = Message::new(0x4321, MessageType::Query, OpCode::Query);
    let mut q = Query::query(Name::from_str(name).unwrap(), RecordType::TXT);
    q.set_query_class(DNSClass::CH);
    msg.add_query(q);
    msg
}

pub fn with_edns(mut msg: Message, version: u8, payload: u16) -> Message {
    let mut edns = Edns::new();
    edns.set_version(version);
    edns.set_max_payload(payload);
    msg.set_edns(edns);
    msg
}

pub fn client() -> SocketAddr {
    "192.0.2.10:40000".parse().unwrap()
}

pub fn udp_request(name: &str, rtype: RecordType) -> Request {
    Request::new(query(name, rtype), client(), Protocol::Udp)
}

pub fn tcp_request(name: &str, rtype: RecordType) -> Request {
    Request::new(query(name, rtype), client(), Protocol::Tcp)
}

pub fn keepalive_request(id: u16) -> Request {
    Request::stateful(
        DsoMessage::request(
            id,
            vec![DsoTlv::KeepAlive {
                inactivity_ms: 0,
                interval_ms: 0,
            }],
        ),
        client(),
        Protocol::Tcp,
    )
}

// ============================================================================
// Shared hit log
// ============================================================================

/// Records which fixture plugin handled a query, in order.
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<Vec<String>>>);

impl Hits {
    pub fn push(&self, label: &str) {
        self.0.lock().unwrap().push(label.to_string());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// ============================================================================
// Fixture plugins
// ============================================================================

/// Answers every query with an empty NOERROR reply.
pub struct Answer {
    pub name: String,
    pub label: String,
    pub hits: Hits,
}

#[async_trait]
impl Handler for Answer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        self.hits.push(&self.label);
        if let Some(view) = &ctx.view {
            self.hits.push(&format!("view:{view}"));
        }
        if let Some(who) = ctx.metadata("fixture/who") {
            self.hits.push(&format!("meta:{who}"));
        }
        let msg = response_for(req.message().unwrap());
        w.write_msg(msg).await?;
        Ok(ResponseCode::NoError)
    }
}

/// Returns a fixed code without writing anything.
pub struct Fixed {
    pub name: String,
    pub rcode: ResponseCode,
}

#[async_trait]
impl Handler for Fixed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        _w: &dyn ResponseWriter,
        _req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        Ok(self.rcode)
    }
}

/// Fails with a plugin error carrying `rcode`.
pub struct Failing {
    pub rcode: Option<ResponseCode>,
}

#[async_trait]
impl Handler for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        _w: &dyn ResponseWriter,
        _req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        match self.rcode {
            Some(rcode) => Err(PluginError::with_rcode("failing", rcode, "told to fail")),
            None => Err(PluginError::failed("failing", "told to fail")),
        }
    }
}

/// Calls the rest of the chain.
pub struct Passthrough {
    pub name: String,
    pub hits: Hits,
}

#[async_trait]
impl Handler for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        self.hits.push(&self.name);
        next.serve_dns(ctx, w, req).await
    }
}

/// Panics on queries for `trigger`, answers everything else.
pub struct Panicker {
    pub trigger: String,
}

#[async_trait]
impl Handler for Panicker {
    fn name(&self) -> &str {
        "panicker"
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        if req.qname() == self.trigger {
            panic!("crafted query {}", self.trigger);
        }
        w.write_msg(response_for(req.message().unwrap())).await?;
        Ok(ResponseCode::NoError)
    }
}

/// Adds `fixture/who` metadata.
pub struct Tagger {
    pub name: String,
}

#[async_trait]
impl Handler for Tagger {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        next.serve_dns(ctx, w, req).await
    }

    fn as_metadata(&self) -> Option<&dyn MetadataCollector> {
        Some(self)
    }
}

impl MetadataCollector for Tagger {
    fn collect(&self, ctx: &mut RequestContext, _req: &Request) {
        ctx.set_metadata("fixture/who", self.name.clone());
    }
}

/// Counts how often metadata is collected.
#[derive(Default)]
pub struct MetadataCounter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Handler for MetadataCounter {
    fn name(&self) -> &str {
        "counter"
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        next.serve_dns(ctx, w, req).await
    }

    fn as_metadata(&self) -> Option<&dyn MetadataCollector> {
        Some(self)
    }
}

impl MetadataCollector for MetadataCounter {
    fn collect(&self, _ctx: &mut RequestContext, _req: &Request) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// View that only admits clients from one address.
pub struct OnlyFrom {
    pub view: String,
    pub allowed: std::net::IpAddr,
}

#[async_trait]
impl Handler for OnlyFrom {
    fn name(&self) -> &str {
        "view"
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        next.serve_dns(ctx, w, req).await
    }

    fn as_view(&self) -> Option<&dyn View> {
        Some(self)
    }
}

impl View for OnlyFrom {
    fn view_name(&self) -> &str {
        &self.view
    }

    fn filter(&self, _ctx: &RequestContext, req: &Request) -> bool {
        req.remote.ip() == self.allowed
    }
}

/// Answers DSO requests with a successful, empty response.
pub struct DsoResponder {
    pub hits: Hits,
}

#[async_trait]
impl Handler for DsoResponder {
    fn name(&self) -> &str {
        "dso"
    }

    async fn serve_dns(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        next.serve_dns(ctx, w, req).await
    }

    fn as_dso(&self) -> Option<&dyn DsoHandler> {
        Some(self)
    }
}

#[async_trait]
impl DsoHandler for DsoResponder {
    async fn serve_dso(
        &self,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: DsoNext<'_>,
    ) -> Result<ResponseCode, PluginError> {
        self.hits.push(&format!("dso:{}", ctx.zone));
        let session = ctx.dso.clone().expect("session attached");
        let response = DsoMessage::response_to(req.dso().unwrap(), 0, Vec::new());
        session.write_response(w, &response).await?;
        Ok(ResponseCode::NoError)
    }
}

/// Authoritative data for one zone with a single delegation.
///
/// Queries at or below the cut get a referral: the NS set in the authority
/// section plus in-bailiwick glue in the additional section.
pub struct DelegatingZone {
    pub origin: String,
    pub cut: String,
    pub nameservers: Vec<(String, Option<std::net::Ipv4Addr>)>,
}

#[async_trait]
impl Handler for DelegatingZone {
    fn name(&self) -> &str {
        "file"
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        let qname = req.qname();
        let mut msg = response_for(req.message().unwrap());

        let below_cut = qname == self.cut || qname.ends_with(&format!(".{}", self.cut));
        if !below_cut {
            msg.set_authoritative(true);
            msg.set_response_code(ResponseCode::NXDomain);
            w.write_msg(msg).await?;
            return Ok(ResponseCode::NXDomain);
        }

        let cut = Name::from_str(&self.cut).unwrap();
        for (ns, glue) in &self.nameservers {
            let ns_name = Name::from_str(ns).unwrap();
            msg.add_name_server(Record::from_rdata(
                cut.clone(),
                3600,
                RData::NS(NS(ns_name.clone())),
            ));
            if let Some(addr) = glue {
                msg.add_additional(Record::from_rdata(ns_name, 3600, RData::A(A(*addr))));
            }
        }
        w.write_msg(msg).await?;
        Ok(ResponseCode::NoError)
    }
}

/// Answers with `count` A records, for size tests.
pub struct Bulky {
    pub count: usize,
}

#[async_trait]
impl Handler for Bulky {
    fn name(&self) -> &str {
        "bulky"
    }

    async fn serve_dns(
        &self,
        _ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
        _next: Next<'_>,
    ) -> Result<ResponseCode, PluginError> {
        let name = Name::from_str(&req.qname()).unwrap();
        let mut msg = response_for(req.message().unwrap());
        for i in 0..self.count {
            let octet = (i % 250) as u8;
            msg.add_answer(Record::from_rdata(
                name.clone(),
                60,
                RData::A(A::new(10, 0, (i / 250) as u8, octet)),
            ));
        }
        w.write_msg(msg).await?;
        Ok(ResponseCode::NoError)
    }
}

// ============================================================================
// Factories and configs
// ============================================================================

/// Factory handing out one prebuilt instance.
pub struct Prebuilt(pub Arc<dyn Handler>);

impl PluginFactory for Prebuilt {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn build(&self, _args: &[String]) -> Result<Arc<dyn Handler>, DomainError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Factory that always fails.
pub struct Broken;

impl PluginFactory for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn build(&self, _args: &[String]) -> Result<Arc<dyn Handler>, DomainError> {
        Err(DomainError::PluginSetup {
            name: "broken".to_string(),
            reason: "no".to_string(),
        })
    }
}

pub fn answer(label: &str, hits: &Hits) -> Arc<dyn Handler> {
    Arc::new(Answer {
        name: "answer".to_string(),
        label: label.to_string(),
        hits: hits.clone(),
    })
}

pub fn config(zone: &str, plugins: Vec<Arc<dyn Handler>>) -> ServerConfig {
    let address = ZoneAddress::normalize_zone(zone).unwrap();
    plugins
        .into_iter()
        .fold(ServerConfig::new(address), |config, plugin| {
            config.with_plugin(Arc::new(Prebuilt(plugin)), Vec::new())
        })
}

pub fn shared(configs: Vec<ServerConfig>) -> Vec<Arc<ServerConfig>> {
    configs.into_iter().map(Arc::new).collect()
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Default)]
pub struct CountingMetrics {
    pub requests: AtomicU64,
    pub panics: AtomicU64,
    pub errors: Mutex<Vec<(String, ResponseCode)>>,
    pub error_count: AtomicUsize,
}

impl CountingMetrics {
    pub fn errors(&self) -> Vec<(String, ResponseCode)> {
        self.errors.lock().unwrap().clone()
    }
}

impl QueryMetrics for CountingMetrics {
    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error_reply(&self, zone: &str, rcode: ResponseCode) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.errors.lock().unwrap().push((zone.to_string(), rcode));
    }
}
