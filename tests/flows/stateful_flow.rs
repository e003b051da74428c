#[path = "../common/mod.rs"]
mod common;
use common::{TestClient, TestServer};

use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use zonemux_application::dso::{DsoMessage, DsoTlv};

const CONFIG: &str = r#"
[[server]]
zones = [".:0"]
grace_timeout_secs = 1
idle_timeout_secs = 2

[server.enhancers]
bind = ["127.0.0.1"]

[[server.plugins]]
name = "whoami"
"#;

fn keepalive(id: u16) -> Vec<u8> {
    DsoMessage::request(
        id,
        vec![DsoTlv::KeepAlive {
            inactivity_ms: 15_000,
            interval_ms: 15_000,
        }],
    )
    .encode()
    .unwrap()
}

#[tokio::test]
async fn test_stateful_request_without_dso_plugin() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.tcp_addr());

    let mut stream = client.connect().await;
    TestClient::send_frame(&mut stream, &keepalive(21)).await;
    let reply = DsoMessage::decode(&TestClient::recv_frame(&mut stream).await).unwrap();
    assert!(reply.response);
    assert_eq!(reply.id, 21);
    assert_eq!(reply.rcode, 4);

    // The connection keeps serving ordinary queries.
    let query = TestClient::query(22, "example.org.", RecordType::A);
    TestClient::send_frame(&mut stream, &query.to_vec().unwrap()).await;
    let reply = Message::from_vec(&TestClient::recv_frame(&mut stream).await).unwrap();
    assert_eq!(reply.id(), 22);
    assert_eq!(reply.response_code(), ResponseCode::NoError);

    server.stop().await;
}

#[tokio::test]
async fn test_stateful_request_over_udp_is_rejected() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.udp_addr());

    let reply = DsoMessage::decode(&client.udp_raw(&keepalive(23)).await).unwrap();
    assert!(reply.response);
    assert_eq!(reply.id, 23);
    assert_eq!(reply.rcode, 2);

    server.stop().await;
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.tcp_addr());

    let mut stream = client.connect().await;
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        tokio::io::AsyncReadExt::read(&mut stream, &mut buf),
    )
    .await
    .expect("closed by idle timeout");
    assert!(matches!(read, Ok(0) | Err(_)));

    server.stop().await;
}
