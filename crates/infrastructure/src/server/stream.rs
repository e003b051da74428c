use super::ServeState;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zonemux_application::ports::{ConnectionInfo, ResponseWriter};
use zonemux_application::Protocol;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Writes length-prefixed frames to one stream connection.
///
/// Frames from concurrent messages are serialized by the mutex; replies may
/// still go out in a different order than the requests arrived.
pub struct StreamWriter<S> {
    half: Mutex<WriteHalf<S>>,
    local: SocketAddr,
    peer: SocketAddr,
    write_timeout: Duration,
    connection: ConnectionInfo,
}

impl<S: AsyncRead + AsyncWrite + Send> StreamWriter<S> {
    async fn shutdown(&self) {
        let mut half = self.half.lock().await;
        if let Err(e) = half.shutdown().await {
            debug!(peer = %self.peer, error = %e, "stream shutdown failed");
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send> ResponseWriter for StreamWriter<S> {
    async fn write_msg(&self, msg: Message) -> io::Result<()> {
        let wire = msg.to_vec().map_err(io::Error::other)?;
        self.write_raw(wire).await
    }

    async fn write_raw(&self, wire: Vec<u8>) -> io::Result<()> {
        let len = u16::try_from(wire.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "message exceeds 65535 bytes"))?;
        let mut frame = Vec::with_capacity(wire.len() + 2);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&wire);

        let mut half = self.half.lock().await;
        tokio::time::timeout(self.write_timeout, async {
            half.write_all(&frame).await?;
            half.flush().await
        })
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "stream write timed out"))?
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn remote_addr(&self) -> SocketAddr {
        self.peer
    }

    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        Some(self.connection.clone())
    }
}

/// Accept connections until `shutdown` fires.
pub async fn serve_listener(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    state: Arc<ServeState>,
    shutdown: CancellationToken,
) {
    static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

    loop {
        let (tcp, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "cannot disable Nagle");
        }
        let local = match tcp.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                debug!(peer = %peer, error = %e, "accepted socket has no local address");
                continue;
            }
        };

        let connection = ConnectionInfo {
            id: NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed),
            cancel: shutdown.child_token(),
        };
        let state = Arc::clone(&state);
        let tls = tls.clone();
        tokio::spawn(async move {
            match tls {
                None => serve_connection(tcp, local, peer, state, connection).await,
                Some(acceptor) => {
                    let handshake =
                        tokio::time::timeout(state.read_timeout, acceptor.accept(tcp)).await;
                    match handshake {
                        Ok(Ok(stream)) => {
                            serve_connection(stream, local, peer, state, connection).await
                        }
                        Ok(Err(e)) => debug!(peer = %peer, error = %e, "TLS handshake failed"),
                        Err(_) => debug!(peer = %peer, "TLS handshake timed out"),
                    }
                }
            }
        });
    }
}

/// Serve one stream connection until the peer leaves, a timeout expires or
/// the connection is cancelled.
///
/// The idle timeout bounds the wait for the next frame; the read timeout
/// bounds reading a frame body once its length arrived.
pub async fn serve_connection<S>(
    stream: S,
    local: SocketAddr,
    peer: SocketAddr,
    state: Arc<ServeState>,
    connection: ConnectionInfo,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let cancel = connection.cancel.clone();
    let (mut reader, half) = tokio::io::split(stream);
    let writer = Arc::new(StreamWriter {
        half: Mutex::new(half),
        local,
        peer,
        write_timeout: state.write_timeout,
        connection,
    });
    let mut tasks = JoinSet::new();

    loop {
        while tasks.try_join_next().is_some() {}

        let len = tokio::select! {
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(state.idle_timeout, reader.read_u16()) => match next {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => {
                    if e.kind() != io::ErrorKind::UnexpectedEof {
                        debug!(peer = %peer, error = %e, "stream read failed");
                    }
                    break;
                }
                Err(_) => {
                    debug!(peer = %peer, "stream idle timeout");
                    break;
                }
            },
        };

        let mut packet = vec![0u8; usize::from(len)];
        match tokio::time::timeout(state.read_timeout, reader.read_exact(&mut packet)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(peer = %peer, error = %e, "stream frame truncated");
                break;
            }
            Err(_) => {
                debug!(peer = %peer, "stream read timeout");
                break;
            }
        }

        let guard = state.in_flight.enter();
        let state = Arc::clone(&state);
        let writer = Arc::clone(&writer);
        tasks.spawn(async move {
            let _guard = guard;
            state.handle(writer.as_ref(), &packet).await;
        });
    }

    // Let replies to messages already read go out, unless the connection
    // was torn down on purpose.
    if !cancel.is_cancelled() {
        let drained = tokio::time::timeout(state.write_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            debug!(
                peer = %peer,
                pending = tasks.len(),
                "replies still pending after write timeout"
            );
        }
    }
    cancel.cancel();
    writer.shutdown().await;
    debug!(peer = %peer, "stream connection closed");
}
