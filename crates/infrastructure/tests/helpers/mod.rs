#![allow(dead_code)]

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use zonemux_application::ports::PluginFactory;
use zonemux_application::services::{ServerConfig, Timeouts};
use zonemux_domain::{Transport, ZoneAddress};

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Messages
// ============================================================================

pub fn query(id: u16, name: &str, rtype: RecordType) -> Message {
    let mut msg = Message::new(id, MessageType::Query, OpCode::Query);
    msg.add_query(Query::query(Name::from_str(name).unwrap(), rtype));
    msg
}

pub fn chaos_query(id: u16, name: &str) -> Message {
    let mut msg = Message::new(id, MessageType::Query, OpCode::Query);
    let mut q = Query::query(Name::from_str(name).unwrap(), RecordType::TXT);
    q.set_query_class(DNSClass::CH);
    msg.add_query(q);
    msg
}

// ============================================================================
// Configs
// ============================================================================

/// Config for `zone` on an ephemeral loopback port.
pub fn loopback_config(zone: &str, plugins: &[Arc<dyn PluginFactory>]) -> Arc<ServerConfig> {
    let mut config = ServerConfig::new(ZoneAddress::new(Transport::Dns, zone, 0))
        .with_hosts(["127.0.0.1"]);
    config.timeouts = Timeouts::from_secs(1, 1, 1, 1);
    for factory in plugins {
        config = config.with_plugin(Arc::clone(factory), Vec::new());
    }
    Arc::new(config)
}

// ============================================================================
// Clients
// ============================================================================

pub async fn udp_exchange(server: SocketAddr, msg: &Message) -> Message {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(&msg.to_vec().unwrap(), server).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let (len, _) = tokio::time::timeout(IO_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("udp reply timed out")
        .unwrap();
    Message::from_vec(&buf[..len]).unwrap()
}

pub async fn tcp_send(stream: &mut TcpStream, wire: &[u8]) {
    let mut frame = (wire.len() as u16).to_be_bytes().to_vec();
    frame.extend_from_slice(wire);
    stream.write_all(&frame).await.unwrap();
}

pub async fn tcp_recv(stream: &mut TcpStream) -> Vec<u8> {
    tokio::time::timeout(IO_TIMEOUT, async {
        let len = stream.read_u16().await.unwrap();
        let mut body = vec![0u8; usize::from(len)];
        stream.read_exact(&mut body).await.unwrap();
        body
    })
    .await
    .expect("tcp reply timed out")
}

pub async fn tcp_exchange(server: SocketAddr, msg: &Message) -> Message {
    let mut stream = TcpStream::connect(server).await.unwrap();
    tcp_send(&mut stream, &msg.to_vec().unwrap()).await;
    Message::from_vec(&tcp_recv(&mut stream).await).unwrap()
}
