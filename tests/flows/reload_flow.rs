#[path = "../common/mod.rs"]
mod common;
use common::{TestClient, TestServer};

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;

fn config(port: u16, plugin: &str) -> String {
    format!(
        r#"
[[server]]
zones = ["example.org:{port}"]
grace_timeout_secs = 1

[server.enhancers]
bind = ["127.0.0.1"]

[[server.plugins]]
name = "{plugin}"
"#
    )
}

// A reload starts the new generation on the same address before the old
// one stops.
#[tokio::test]
async fn test_new_generation_takes_over_address() {
    let old = TestServer::start(&config(0, "whoami")).await;
    let port = old.udp_addr().port();

    let new = TestServer::start(&config(port, "log")).await;
    assert_eq!(new.udp_addr().port(), port);
    old.stop().await;

    // Only the new generation is left: its chain ends after `log`.
    let client = TestClient::new(new.udp_addr());
    let reply = client
        .udp(&TestClient::query(31, "example.org.", RecordType::A))
        .await;
    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    let reply = TestClient::new(new.tcp_addr())
        .tcp(&TestClient::query(32, "example.org.", RecordType::A))
        .await;
    assert_eq!(reply.response_code(), ResponseCode::ServFail);

    new.stop().await;
}

#[tokio::test]
async fn test_stop_leaves_nothing_in_flight() {
    let server = TestServer::start(&config(0, "whoami")).await;
    let client = TestClient::new(server.udp_addr());
    client
        .udp(&TestClient::query(33, "example.org.", RecordType::A))
        .await;
    server.stop().await;
    assert_eq!(server.metrics.snapshot().requests, 1);
    assert_eq!(server.server().in_flight(), 0);
}
