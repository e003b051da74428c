#![allow(dead_code)]

mod client;
mod test_server;

pub use client::TestClient;
pub use test_server::TestServer;
