use super::ServeState;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zonemux_application::ports::ResponseWriter;
use zonemux_application::Protocol;

const MAX_DATAGRAM: usize = 65_535;

/// Replies to one datagram client.
pub struct UdpWriter {
    socket: Arc<UdpSocket>,
    local: SocketAddr,
    peer: SocketAddr,
    write_timeout: Duration,
}

#[async_trait]
impl ResponseWriter for UdpWriter {
    async fn write_msg(&self, msg: Message) -> io::Result<()> {
        let wire = msg.to_vec().map_err(io::Error::other)?;
        self.write_raw(wire).await
    }

    async fn write_raw(&self, wire: Vec<u8>) -> io::Result<()> {
        tokio::time::timeout(self.write_timeout, self.socket.send_to(&wire, self.peer))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "datagram write timed out"))??;
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn remote_addr(&self) -> SocketAddr {
        self.peer
    }

    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }
}

/// Read datagrams until `shutdown` fires; every message is served on its
/// own task.
pub async fn serve_udp(socket: Arc<UdpSocket>, state: Arc<ServeState>, shutdown: CancellationToken) {
    let local = match socket.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            debug!(error = %e, "datagram socket has no local address");
            return;
        }
    };
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    // ICMP errors from earlier replies surface here on some
                    // platforms; the socket itself is still usable.
                    debug!(error = %e, "datagram receive failed");
                    continue;
                }
            },
        };

        let packet = buf[..len].to_vec();
        let guard = state.in_flight.enter();
        let writer = UdpWriter {
            socket: Arc::clone(&socket),
            local,
            peer,
            write_timeout: state.write_timeout,
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let _guard = guard;
            state.handle(&writer, &packet).await;
        });
    }

    debug!(local = %local, "datagram reader stopped");
}
