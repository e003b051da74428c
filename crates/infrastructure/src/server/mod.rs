//! Listener lifecycle for one bind address.
//!
//! A [`DnsServer`] owns the sockets of one `transport://addr` group and the
//! [`Multiplexer`] routing the zones that share it. Plain DNS listens on
//! both UDP and TCP; TLS and gRPC listen on TCP only.

mod in_flight;
mod socket;
mod stream;
mod tls;
mod udp;

pub use in_flight::InFlight;
pub use socket::BindHost;

use crate::errors::ServerError;
use crate::tsig::TsigProvider;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use zonemux_application::ports::{QueryMetrics, ResponseWriter};
use zonemux_application::services::{Multiplexer, ServerConfig};
use zonemux_application::TsigStatus;
use zonemux_domain::Transport;

/// What every socket task of one server shares.
pub struct ServeState {
    mux: Arc<Multiplexer>,
    tsig: TsigProvider,
    in_flight: Arc<InFlight>,
    read_timeout: Duration,
    write_timeout: Duration,
    idle_timeout: Duration,
}

impl ServeState {
    fn new(mux: Arc<Multiplexer>) -> Self {
        let settings = mux.settings();
        Self {
            tsig: TsigProvider::new(settings.tsig_keys.clone()),
            read_timeout: settings.read_timeout,
            write_timeout: settings.write_timeout,
            idle_timeout: settings.idle_timeout,
            in_flight: InFlight::new(),
            mux,
        }
    }

    /// Verify the TSIG of `packet`, if any, and route it.
    async fn handle(&self, w: &dyn ResponseWriter, packet: &[u8]) {
        let tsig = if self.tsig.is_empty() {
            TsigStatus::Unsigned
        } else {
            self.tsig.verify_packet(packet, unix_now())
        };
        self.mux.serve_packet(w, packet, tsig).await;
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// One listening address and the zones served on it.
pub struct DnsServer {
    address: String,
    transport: Transport,
    host: BindHost,
    tls: Option<TlsAcceptor>,
    state: Arc<ServeState>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    local_addrs: Mutex<Vec<SocketAddr>>,
}

impl DnsServer {
    /// Compile the configs of one address group. `address` is the group key
    /// produced by [`group_by_listen_address`](crate::group_by_listen_address).
    pub fn new(
        address: &str,
        group: &[Arc<ServerConfig>],
        metrics: Arc<dyn QueryMetrics>,
    ) -> Result<Self, ServerError> {
        let (transport, host) = BindHost::parse(address)?;
        let mux = Multiplexer::new(group, metrics)?;

        let tls = match transport {
            Transport::Tls => {
                let files = group
                    .iter()
                    .find_map(|config| config.tls.as_ref())
                    .ok_or_else(|| ServerError::Tls {
                        addr: address.to_string(),
                        reason: "no certificate configured".to_string(),
                    })?;
                Some(tls::load_acceptor(address, files)?)
            }
            _ => None,
        };

        Ok(Self {
            address: address.to_string(),
            transport,
            host,
            tls,
            state: Arc::new(ServeState::new(Arc::new(mux))),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            local_addrs: Mutex::new(Vec::new()),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn multiplexer(&self) -> &Arc<Multiplexer> {
        &self.state.mux
    }

    /// Messages currently being served.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.pending()
    }

    /// Bind the sockets and spawn their reader tasks.
    ///
    /// Returns the bound addresses, datagram first. With port 0 the stream
    /// listener reuses the port the datagram socket got.
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn start(&self) -> Result<Vec<SocketAddr>, ServerError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() || self.shutdown.is_cancelled() {
            return Err(ServerError::AlreadyStarted(self.address.clone()));
        }

        let bind_err = |source| ServerError::Bind {
            addr: self.address.clone(),
            source,
        };
        let mut bound = Vec::with_capacity(2);

        let mut pinned = None;
        if self.transport == Transport::Dns {
            let udp = socket::bind_udp(&self.host).map_err(bind_err)?;
            let local = udp.local_addr().map_err(bind_err)?;
            pinned = Some(local);
            bound.push(local);
            tasks.push(tokio::spawn(udp::serve_udp(
                Arc::new(udp),
                Arc::clone(&self.state),
                self.shutdown.clone(),
            )));
        }

        let tcp = match socket::bind_tcp(&self.host, pinned) {
            Ok(tcp) => tcp,
            Err(e) => {
                self.shutdown.cancel();
                return Err(bind_err(e));
            }
        };
        bound.push(tcp.local_addr().map_err(bind_err)?);
        tasks.push(tokio::spawn(stream::serve_listener(
            tcp,
            self.tls.clone(),
            Arc::clone(&self.state),
            self.shutdown.clone(),
        )));

        info!(transport = %self.transport, addrs = ?bound, "Listening");
        *self.local_addrs.lock().await = bound.clone();
        Ok(bound)
    }

    pub async fn local_addrs(&self) -> Vec<SocketAddr> {
        self.local_addrs.lock().await.clone()
    }

    /// Stop accepting, wait for in-flight messages up to the grace timeout,
    /// then close every listener and connection.
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn stop(&self) {
        let grace = self.state.mux.settings().grace_timeout;
        if cfg!(unix) {
            if !self.state.in_flight.drain(grace).await {
                warn!(
                    pending = self.state.in_flight.pending(),
                    grace_ms = grace.as_millis() as u64,
                    "Grace period expired with messages still in flight"
                );
            }
        } else {
            debug!("No grace window on this platform");
        }

        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Listener task ended abnormally");
            }
        }
        info!("Server stopped");
    }
}
