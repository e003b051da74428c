use super::{DsoError, DsoMessage, DsoTlv};
use crate::ports::ResponseWriter;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Smallest keepalive interval a server may announce (RFC 8490 section 6.5.2).
pub const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

const INACTIVITY_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsoState {
    Waiting,
    /// A successful response is being written and will establish the
    /// session. Never returned by [`DsoSession::state`].
    Pending,
    Established,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub inactivity: Duration,
    pub interval: Duration,
}

impl KeepAlive {
    /// Parameters derived from the listener's idle timeout: inactivity is
    /// `min(idle - 5s, idle / 2)` (never negative), interval is
    /// `max(10s, idle / 2)`.
    pub fn from_idle_timeout(idle: Duration) -> Self {
        let half = idle / 2;
        Self {
            inactivity: idle.saturating_sub(INACTIVITY_MARGIN).min(half),
            interval: half.max(MIN_KEEPALIVE_INTERVAL),
        }
    }

    pub fn to_tlv(self) -> DsoTlv {
        DsoTlv::KeepAlive {
            inactivity_ms: millis(self.inactivity),
            interval_ms: millis(self.interval),
        }
    }
}

/// Session state for one stream connection.
///
/// Writes that are not a session close hold the shared side of `lock`, so
/// established sessions can write concurrently. A close takes the exclusive
/// side and therefore waits out any establishment in progress, which makes
/// it the last write of the session.
pub struct DsoSession {
    state: watch::Sender<DsoState>,
    lock: RwLock<()>,
    idle_timeout: Duration,
    keepalive: OnceLock<KeepAlive>,
    connection: Option<CancellationToken>,
}

impl DsoSession {
    pub fn new(idle_timeout: Duration, connection: Option<CancellationToken>) -> Self {
        let (state, _) = watch::channel(DsoState::Waiting);
        Self {
            state,
            lock: RwLock::new(()),
            idle_timeout,
            keepalive: OnceLock::new(),
            connection,
        }
    }

    /// A session for a connection that is already gone.
    pub fn closed(idle_timeout: Duration) -> Self {
        let session = Self::new(idle_timeout, None);
        session.state.send_replace(DsoState::Closed);
        session
    }

    /// Current state, waiting for a pending establishment to resolve first.
    pub async fn state(&self) -> DsoState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|state| *state != DsoState::Pending).await {
            Ok(state) => *state,
            // The sender lives in `self`; this is unreachable while borrowed.
            Err(_) => DsoState::Closed,
        };
        state
    }

    /// Keepalive parameters this server announces, computed once.
    pub fn keepalive(&self) -> KeepAlive {
        *self
            .keepalive
            .get_or_init(|| KeepAlive::from_idle_timeout(self.idle_timeout))
    }

    /// Write a response to a client request.
    ///
    /// The first successful response written while `Waiting` establishes the
    /// session. Exactly one concurrent caller wins that race and performs the
    /// write; if its response carried no KeepAlive TLV it follows up with a
    /// unidirectional KeepAlive. The others wait for the outcome.
    pub async fn write_response(
        &self,
        w: &dyn ResponseWriter,
        msg: &DsoMessage,
    ) -> Result<(), DsoError> {
        let _shared = self.lock.read().await;

        if msg.is_success() && self.try_begin_establish() {
            if let Err(e) = self.write_frame(w, msg).await {
                self.finish_establish(DsoState::Closed);
                return Err(e);
            }
            self.finish_establish(DsoState::Established);
            debug!(id = msg.id, "DSO session established");

            if !msg.has_keepalive() {
                let announce = DsoMessage::unidirectional(vec![self.keepalive().to_tlv()]);
                self.write_frame(w, &announce).await?;
            }
            return Ok(());
        }

        match self.state().await {
            DsoState::Closed => Err(DsoError::Closed),
            // Error responses do not establish a session but still go out.
            DsoState::Waiting | DsoState::Established | DsoState::Pending => {
                self.write_frame(w, msg).await
            }
        }
    }

    /// Send a server-initiated request; returns the id it was sent with.
    pub async fn write_request(
        &self,
        w: &dyn ResponseWriter,
        tlvs: Vec<DsoTlv>,
    ) -> Result<u16, DsoError> {
        let msg = DsoMessage::request(fastrand::u16(1..), tlvs);
        self.write_established(w, &msg).await?;
        Ok(msg.id)
    }

    pub async fn write_unidirectional(
        &self,
        w: &dyn ResponseWriter,
        tlvs: Vec<DsoTlv>,
    ) -> Result<(), DsoError> {
        self.write_established(w, &DsoMessage::unidirectional(tlvs))
            .await
    }

    /// Tell the client to disconnect and retry after `retry_delay`, then
    /// close the session and its connection.
    ///
    /// A session that was never established is closed without a write; a
    /// closed session is left alone.
    pub async fn write_close_unidirectional(
        &self,
        w: &dyn ResponseWriter,
        retry_delay: Duration,
    ) -> Result<(), DsoError> {
        let _exclusive = self.lock.write().await;

        let result = match self.state().await {
            DsoState::Closed => return Ok(()),
            DsoState::Established => {
                let msg = DsoMessage::unidirectional(vec![DsoTlv::RetryDelay(millis(retry_delay))]);
                self.write_frame(w, &msg).await
            }
            DsoState::Waiting | DsoState::Pending => Ok(()),
        };

        self.state.send_replace(DsoState::Closed);
        if let Some(connection) = &self.connection {
            connection.cancel();
        }
        debug!("DSO session closed by server");
        result
    }

    async fn write_established(
        &self,
        w: &dyn ResponseWriter,
        msg: &DsoMessage,
    ) -> Result<(), DsoError> {
        let _shared = self.lock.read().await;
        match self.state().await {
            DsoState::Established => self.write_frame(w, msg).await,
            DsoState::Closed => Err(DsoError::Closed),
            DsoState::Waiting | DsoState::Pending => Err(DsoError::BadState),
        }
    }

    /// Encode and write one frame; a transport error closes the session.
    async fn write_frame(&self, w: &dyn ResponseWriter, msg: &DsoMessage) -> Result<(), DsoError> {
        let wire = msg.encode()?;
        if let Err(e) = w.write_raw(wire).await {
            self.state.send_replace(DsoState::Closed);
            return Err(DsoError::Io(e));
        }
        Ok(())
    }

    fn try_begin_establish(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == DsoState::Waiting {
                *state = DsoState::Pending;
                true
            } else {
                false
            }
        })
    }

    fn finish_establish(&self, outcome: DsoState) {
        self.state.send_if_modified(|state| {
            if *state == DsoState::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        });
    }
}

fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
