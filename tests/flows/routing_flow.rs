#[path = "../common/mod.rs"]
mod common;
use common::{TestClient, TestServer};

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{RData, RecordType};

const CONFIG: &str = r#"
[[server]]
zones = ["example.org:0", "10.0.0.0/24:0"]
read_timeout_secs = 1
idle_timeout_secs = 1
grace_timeout_secs = 1

[server.enhancers]
bind = ["127.0.0.1"]

[[server.plugins]]
name = "log"

[[server.plugins]]
name = "whoami"

[[server]]
zones = [".:0"]
grace_timeout_secs = 1

[server.enhancers]
bind = ["127.0.0.1"]

[[server.plugins]]
name = "chaos"
args = ["zonemux-flow"]
"#;

// ============================================================================
// Routing over real sockets
// ============================================================================

#[tokio::test]
async fn test_blocks_on_same_address_share_one_server() {
    let server = TestServer::start(CONFIG).await;
    assert_eq!(server.server_count(), 1);
    assert_eq!(server.server().multiplexer().zones().count(), 3);
    server.stop().await;
}

#[tokio::test]
async fn test_zone_query_reaches_its_chain() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.udp_addr());

    let reply = client
        .udp(&TestClient::query(11, "host.example.org.", RecordType::A))
        .await;
    assert_eq!(reply.id(), 11);
    assert_eq!(reply.response_code(), ResponseCode::NoError);
    assert!(matches!(reply.answers()[0].data(), RData::A(_)));

    server.stop().await;
}

#[tokio::test]
async fn test_other_names_fall_back_to_root() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.udp_addr());

    let reply = client.udp(&TestClient::chaos(12, "version.bind.")).await;
    assert_eq!(reply.response_code(), ResponseCode::NoError);
    match reply.answers()[0].data() {
        RData::TXT(txt) => assert_eq!(&txt.iter().next().unwrap()[..], b"zonemux-flow"),
        other => panic!("unexpected {other:?}"),
    }

    // The root chain has nothing after chaos for ordinary queries.
    let reply = client
        .udp(&TestClient::query(13, "example.net.", RecordType::A))
        .await;
    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    server.stop().await;
}

#[tokio::test]
async fn test_reverse_zone_is_narrowed_to_cidr() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.udp_addr());

    let inside = client
        .udp(&TestClient::query(14, "5.0.0.10.in-addr.arpa.", RecordType::PTR))
        .await;
    assert_eq!(inside.response_code(), ResponseCode::NoError);
    assert_eq!(inside.answers().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_tcp_and_udp_give_same_routing() {
    let server = TestServer::start(CONFIG).await;
    let udp = TestClient::new(server.udp_addr());
    let tcp = TestClient::new(server.tcp_addr());

    let query = TestClient::query(15, "example.org.", RecordType::A);
    let by_udp = udp.udp(&query).await;
    let by_tcp = tcp.tcp(&query).await;
    assert_eq!(by_udp.answers(), by_tcp.answers());
    assert_eq!(by_tcp.additionals()[0].name().to_ascii(), "_tcp.example.org.");

    server.stop().await;
}

#[tokio::test]
async fn test_garbage_gets_servfail_with_its_id() {
    let server = TestServer::start(CONFIG).await;
    let client = TestClient::new(server.udp_addr());

    let mut wire = TestClient::query(0xbeef, "example.org.", RecordType::A)
        .to_vec()
        .unwrap();
    wire.truncate(wire.len() - 3);
    let reply = hickory_proto::op::Message::from_vec(&client.udp_raw(&wire).await).unwrap();
    assert_eq!(reply.id(), 0xbeef);
    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    server.stop().await;
    let snapshot = server.metrics.snapshot();
    assert_eq!(snapshot.requests, 0);
    assert_eq!(snapshot.error_replies_for(""), 1);
}
