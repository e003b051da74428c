use crate::errors::ServerError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{TcpListener, UdpSocket};
use tracing::debug;
use zonemux_domain::Transport;

const LISTEN_BACKLOG: i32 = 1024;

/// Where a listener binds, parsed from a `transport://addr` group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindHost {
    /// `:port`, all interfaces.
    Wildcard(u16),
    Exact(SocketAddr),
}

impl BindHost {
    pub fn parse(key: &str) -> Result<(Transport, Self), ServerError> {
        let invalid = |reason: &str| ServerError::InvalidAddress {
            addr: key.to_string(),
            reason: reason.to_string(),
        };

        let (transport, rest) = Transport::split_prefix(key)?;
        if let Some(port) = rest.strip_prefix(':') {
            let port = port.parse().map_err(|_| invalid("bad port"))?;
            return Ok((transport, Self::Wildcard(port)));
        }
        let addr = rest
            .parse::<SocketAddr>()
            .map_err(|_| invalid("expected host:port"))?;
        Ok((transport, Self::Exact(addr)))
    }

    /// Addresses to try in order. The wildcard prefers a dual-stack IPv6
    /// socket and falls back to IPv4 on hosts without IPv6.
    fn candidates(&self) -> Vec<SocketAddr> {
        match *self {
            Self::Wildcard(port) => vec![
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ],
            Self::Exact(addr) => vec![addr],
        }
    }
}

/// A socket with `SO_REUSEPORT`, so a reloaded server can bind the same
/// address before the old one lets go.
fn reusable_socket(addr: SocketAddr, ty: Type, proto: Protocol) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), ty, Some(proto))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    if addr.is_ipv6() && addr.ip().is_unspecified() {
        socket.set_only_v6(false)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket)
}

fn first_bound<T>(
    candidates: &[SocketAddr],
    mut bind: impl FnMut(SocketAddr) -> io::Result<T>,
) -> io::Result<T> {
    let mut last = io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to bind");
    for addr in candidates {
        match bind(*addr) {
            Ok(bound) => return Ok(bound),
            Err(e) => {
                debug!(addr = %addr, error = %e, "bind attempt failed");
                last = e;
            }
        }
    }
    Err(last)
}

pub fn bind_udp(host: &BindHost) -> io::Result<UdpSocket> {
    first_bound(&host.candidates(), |addr| {
        let socket = reusable_socket(addr, Type::DGRAM, Protocol::UDP)?;
        UdpSocket::from_std(socket.into())
    })
}

/// Bind a stream listener. `exact` pins the address, which keeps TCP on
/// the same port as a UDP socket bound to port 0.
pub fn bind_tcp(host: &BindHost, exact: Option<SocketAddr>) -> io::Result<TcpListener> {
    let candidates = match exact {
        Some(addr) => vec![addr],
        None => host.candidates(),
    };
    first_bound(&candidates, |addr| {
        let socket = reusable_socket(addr, Type::STREAM, Protocol::TCP)?;
        socket.listen(LISTEN_BACKLOG)?;
        TcpListener::from_std(socket.into())
    })
}
