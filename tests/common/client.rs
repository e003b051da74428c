use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

const TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestClient {
    server: SocketAddr,
}

impl TestClient {
    pub fn new(server: SocketAddr) -> Self {
        Self { server }
    }

    pub fn query(id: u16, name: &str, rtype: RecordType) -> Message {
        let mut msg = Message::new(id, MessageType::Query, OpCode::Query);
        msg.add_query(Query::query(Name::from_str(name).unwrap(), rtype));
        msg
    }

    pub fn chaos(id: u16, name: &str) -> Message {
        let mut msg = Self::query(id, name, RecordType::TXT);
        let mut q = msg.take_queries().remove(0);
        q.set_query_class(DNSClass::CH);
        msg.add_query(q);
        msg
    }

    pub async fn udp(&self, msg: &Message) -> Message {
        let raw = self.udp_raw(&msg.to_vec().unwrap()).await;
        Message::from_vec(&raw).unwrap()
    }

    pub async fn udp_raw(&self, wire: &[u8]) -> Vec<u8> {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(wire, self.server).await.unwrap();
        let mut buf = vec![0u8; 65535];
        let (len, _) = tokio::time::timeout(TIMEOUT, socket.recv_from(&mut buf))
            .await
            .expect("udp reply")
            .unwrap();
        buf.truncate(len);
        buf
    }

    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.server).await.unwrap()
    }

    pub async fn send_frame(stream: &mut TcpStream, wire: &[u8]) {
        let mut frame = (wire.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(wire);
        stream.write_all(&frame).await.unwrap();
    }

    pub async fn recv_frame(stream: &mut TcpStream) -> Vec<u8> {
        tokio::time::timeout(TIMEOUT, async {
            let len = stream.read_u16().await.unwrap();
            let mut body = vec![0u8; usize::from(len)];
            stream.read_exact(&mut body).await.unwrap();
            body
        })
        .await
        .expect("tcp reply")
    }

    pub async fn tcp(&self, msg: &Message) -> Message {
        let mut stream = self.connect().await;
        Self::send_frame(&mut stream, &msg.to_vec().unwrap()).await;
        Message::from_vec(&Self::recv_frame(&mut stream).await).unwrap()
    }
}
