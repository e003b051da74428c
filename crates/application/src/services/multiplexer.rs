use crate::context::RequestContext;
use crate::dso::{DsoMessage, DsoSession, DsoSessions};
use crate::errors::client_wrote;
use crate::ports::{Handler, QueryMetrics, ResponseWriter};
use crate::request::{Request, RequestKind, TsigStatus, MIN_UDP_PAYLOAD};
use crate::services::compiled::CompiledConfig;
use crate::services::replies::{badvers_reply, error_reply, header_rcode, servfail_for_id};
use crate::services::scrub::ScrubWriter;
use crate::services::server_config::ServerConfig;
use crate::services::settings::ServerSettings;
use futures::FutureExt;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{DNSClass, RecordType};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};
use zonemux_domain::validators::label_suffixes;
use zonemux_domain::DomainError;

/// Metrics zone for queries no config accepted.
pub const DROPPED_ZONE: &str = "dropped";

const ROOT: &str = ".";

/// Routes queries arriving on one listen address to the config that
/// serves them.
///
/// The zone table is built once; a reload builds a new multiplexer.
pub struct Multiplexer {
    zones: FxHashMap<String, Vec<CompiledConfig>>,
    settings: ServerSettings,
    dso_enabled: bool,
    chaos_enabled: bool,
    sessions: Arc<DsoSessions>,
    metrics: Arc<dyn QueryMetrics>,
}

impl Multiplexer {
    pub fn new(
        group: &[Arc<ServerConfig>],
        metrics: Arc<dyn QueryMetrics>,
    ) -> Result<Self, DomainError> {
        let settings = ServerSettings::merge(group);
        let mut zones: FxHashMap<String, Vec<CompiledConfig>> = FxHashMap::default();
        let mut dso_enabled = false;
        let mut chaos_enabled = false;

        for config in group {
            let compiled = CompiledConfig::compile(Arc::clone(config))?;
            // Stateful messages carry no question and only ever route to the root.
            dso_enabled |= compiled.dso_chain.is_some() && config.zone() == ROOT;
            chaos_enabled |= compiled.unblocks_chaos;
            zones
                .entry(config.zone().to_string())
                .or_default()
                .push(compiled);
        }

        Ok(Self {
            sessions: DsoSessions::new(settings.idle_timeout),
            zones,
            settings,
            dso_enabled,
            chaos_enabled,
            metrics,
        })
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Whether a root zone config has a DSO-capable plugin. A DSO plugin
    /// in any other zone never sees a stateful message.
    pub fn dso_enabled(&self) -> bool {
        self.dso_enabled
    }

    pub fn chaos_enabled(&self) -> bool {
        self.chaos_enabled
    }

    pub fn sessions(&self) -> &Arc<DsoSessions> {
        &self.sessions
    }

    /// Zones served, in no particular order.
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// The first `trace` plugin of any config.
    pub fn tracer(&self) -> Option<&Arc<dyn Handler>> {
        self.zones.values().flatten().find_map(|c| c.tracer())
    }

    /// Decode and serve one raw packet.
    pub async fn serve_packet(&self, w: &dyn ResponseWriter, packet: &[u8], tsig: TsigStatus) {
        match Request::decode(packet, w.remote_addr(), w.protocol()) {
            Ok(req) => self.serve_request(w, req.with_tsig(tsig)).await,
            Err(e) => {
                debug!(remote = %w.remote_addr(), error = %e.reason, "undecodable message");
                self.metrics.record_error_reply("", ResponseCode::ServFail);
                if let Some(id) = e.id {
                    if let Err(e) = w.write_msg(servfail_for_id(id)).await {
                        debug!(error = %e, "failed to write error reply");
                    }
                }
            }
        }
    }

    pub async fn serve_request(&self, w: &dyn ResponseWriter, req: Request) {
        let scrub = ScrubWriter::new(w, &req);
        let w: &dyn ResponseWriter = &scrub;
        self.metrics.record_request();

        if req.is_stateful() {
            if req.protocol.is_datagram() {
                return self.write_error(w, &req, "", ResponseCode::ServFail, None).await;
            }
            if !self.dso_enabled {
                return self.write_error(w, &req, "", ResponseCode::NotImp, None).await;
            }
        } else {
            if req.question_count() == 0 {
                return self.write_error(w, &req, "", ResponseCode::ServFail, None).await;
            }
            if !self.chaos_enabled && req.qclass() != Some(DNSClass::IN) {
                return self.write_error(w, &req, "", ResponseCode::Refused, None).await;
            }
            if let (Some(version), Some(msg)) = (req.edns_version(), req.message()) {
                if version != 0 {
                    debug!(version, remote = %req.remote, "unsupported EDNS version");
                    let payload = req.edns_payload().unwrap_or(MIN_UDP_PAYLOAD);
                    if let Err(e) = w.write_msg(badvers_reply(msg, payload)).await {
                        debug!(error = %e, "failed to write BADVERS reply");
                    }
                    return;
                }
            }
        }

        let mut ctx = RequestContext::new();
        if req.is_stateful() {
            let Some(connection) = w.connection() else {
                return self.write_error(w, &req, "", ResponseCode::ServFail, None).await;
            };
            ctx.dso = Some(self.sessions.get_or_create(&connection));
        }

        if self.settings.debug {
            self.route(&mut ctx, w, &req).await;
            return;
        }

        let outcome = AssertUnwindSafe(self.route(&mut ctx, w, &req))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            self.metrics.record_panic();
            error!(
                zone = %ctx.zone,
                qname = %req.qname(),
                remote = %req.remote,
                panic = %panic_message(panic.as_ref()),
                "recovered from panic in plugin chain"
            );
            let zone = ctx.zone.clone();
            self.write_error(w, &req, &zone, ResponseCode::ServFail, ctx.dso.as_deref())
                .await;
        }
    }

    async fn route(&self, ctx: &mut RequestContext, w: &dyn ResponseWriter, req: &Request) {
        let qname = req.qname();
        let stateful = req.is_stateful();
        let is_ds = !stateful && req.qtype() == Some(RecordType::DS);

        let suffixes: SmallVec<[&str; 8]> = if qname == ROOT {
            SmallVec::from_slice(&[ROOT])
        } else {
            label_suffixes(&qname).collect()
        };

        let mut ds_candidate: Option<(&str, &CompiledConfig)> = None;
        for zone in suffixes {
            let Some(candidates) = self.zones.get(zone) else {
                continue;
            };
            for h in candidates {
                if h.chain.is_none() {
                    let dso = ctx.dso.as_deref();
                    return self.write_error(w, req, zone, ResponseCode::Refused, dso).await;
                }
                if stateful && h.dso_chain.is_none() {
                    let dso = ctx.dso.as_deref();
                    return self.write_error(w, req, zone, ResponseCode::NotImp, dso).await;
                }
                h.collect_metadata(ctx, req);
                if !h.passes_filters(ctx, req) {
                    continue;
                }
                if is_ds {
                    // A DS record lives in the parent: keep looking for one.
                    ds_candidate = Some((zone, h));
                    continue;
                }
                return self.dispatch(zone, h, ctx, w, req).await;
            }
        }

        if let Some((zone, h)) = ds_candidate {
            return self.dispatch(zone, h, ctx, w, req).await;
        }

        // The suffix walk above already tried the root for a root query.
        let root_candidates = if qname == ROOT {
            None
        } else {
            self.zones.get(ROOT)
        };
        if let Some(candidates) = root_candidates {
            for h in candidates {
                if h.chain.is_none() || (stateful && h.dso_chain.is_none()) {
                    continue;
                }
                h.collect_metadata(ctx, req);
                if h.passes_filters(ctx, req) {
                    return self.dispatch(ROOT, h, ctx, w, req).await;
                }
            }
        }

        let dso = ctx.dso.as_deref();
        self.write_error(w, req, DROPPED_ZONE, ResponseCode::Refused, dso)
            .await;
    }

    async fn dispatch(
        &self,
        zone: &str,
        h: &CompiledConfig,
        ctx: &mut RequestContext,
        w: &dyn ResponseWriter,
        req: &Request,
    ) {
        ctx.zone = zone.to_string();
        if let Some(view) = &h.view {
            ctx.view = Some(view.clone());
        }

        let result = match (&req.kind, &h.chain, &h.dso_chain) {
            (RequestKind::Stateful(_), _, Some(dso)) => dso.serve_dso(ctx, w, req).await,
            (RequestKind::Query(_), Some(chain), _) => chain.serve_dns(ctx, w, req).await,
            _ => Ok(ResponseCode::Refused),
        };

        let rcode = match result {
            Ok(rcode) => rcode,
            Err(e) => {
                debug!(zone, qname = %req.qname(), error = %e, "plugin chain failed");
                e.rcode()
            }
        };
        if !client_wrote(rcode) {
            self.write_error(w, req, zone, rcode, ctx.dso.as_deref())
                .await;
        }
    }

    /// Write a reply carrying only `rcode`.
    ///
    /// Replies to stateful messages go through the connection's session
    /// when there is one, so a closed session writes nothing.
    async fn write_error(
        &self,
        w: &dyn ResponseWriter,
        req: &Request,
        zone: &str,
        rcode: ResponseCode,
        dso: Option<&DsoSession>,
    ) {
        self.metrics.record_error_reply(zone, rcode);
        debug!(
            zone,
            qname = %req.qname(),
            rcode = ?rcode,
            remote = %req.remote,
            "writing error reply"
        );

        let result = match &req.kind {
            RequestKind::Query(msg) => w.write_msg(error_reply(msg, rcode)).await,
            // Unidirectional messages never get a response.
            RequestKind::Stateful(msg) if msg.is_unidirectional() => Ok(()),
            RequestKind::Stateful(msg) => {
                let reply = DsoMessage::response_to(msg, header_rcode(rcode), Vec::new());
                match dso {
                    Some(session) => session
                        .write_response(w, &reply)
                        .await
                        .map_err(io::Error::other),
                    None => match reply.encode() {
                        Ok(wire) => w.write_raw(wire).await,
                        Err(e) => Err(io::Error::other(e)),
                    },
                }
            }
        };
        if let Err(e) = result {
            debug!(error = %e, "failed to write error reply");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}
