use crate::request::Protocol;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::io;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Identity of a stream connection and the token that tears it down.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: u64,
    pub cancel: CancellationToken,
}

/// Sends replies back to the client a request came from.
#[async_trait]
pub trait ResponseWriter: Send + Sync {
    async fn write_msg(&self, msg: Message) -> io::Result<()>;

    /// Write an already encoded message, e.g. a DSO frame.
    async fn write_raw(&self, wire: Vec<u8>) -> io::Result<()>;

    fn local_addr(&self) -> SocketAddr;

    fn remote_addr(&self) -> SocketAddr;

    fn protocol(&self) -> Protocol;

    /// The underlying connection, for stream transports.
    fn connection(&self) -> Option<ConnectionInfo> {
        None
    }
}
