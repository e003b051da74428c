use async_trait::async_trait;
use hickory_proto::op::Message;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use zonemux_application::dso::DsoMessage;
use zonemux_application::ports::{ConnectionInfo, ResponseWriter};
use zonemux_application::Protocol;

// ============================================================================
// Recording response writer
// ============================================================================

pub struct FakeWriter {
    protocol: Protocol,
    remote: SocketAddr,
    connection: Option<ConnectionInfo>,
    messages: Mutex<Vec<Message>>,
    frames: Mutex<Vec<Vec<u8>>>,
    fail_writes: AtomicBool,
    write_delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
    writes_started: AtomicUsize,
}

impl FakeWriter {
    pub fn udp() -> Self {
        Self::new(Protocol::Udp, None)
    }

    pub fn tcp() -> Self {
        Self::new(
            Protocol::Tcp,
            Some(ConnectionInfo {
                id: 1,
                cancel: CancellationToken::new(),
            }),
        )
    }

    pub fn new(protocol: Protocol, connection: Option<ConnectionInfo>) -> Self {
        Self {
            protocol,
            remote: "192.0.2.10:40000".parse().unwrap(),
            connection,
            messages: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            write_delay: None,
            gate: None,
            entered: Arc::new(Notify::new()),
            writes_started: AtomicUsize::new(0),
        }
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = remote.parse().unwrap();
        self
    }

    /// Every write sleeps this long before completing.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Every write waits for a permit on `gate` before completing.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Resolves once a write has started.
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.connection.as_ref().unwrap().cancel.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> Message {
        self.messages
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no message written")
    }

    pub fn frames(&self) -> Vec<DsoMessage> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|wire| DsoMessage::decode(wire).unwrap())
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.messages.lock().unwrap().len() + self.frames.lock().unwrap().len()
    }

    async fn before_write(&self) -> io::Result<()> {
        self.writes_started.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseWriter for FakeWriter {
    async fn write_msg(&self, msg: Message) -> io::Result<()> {
        self.before_write().await?;
        // Replies must survive a trip through the wire format.
        let wire = msg.to_vec().map_err(io::Error::other)?;
        let decoded = Message::from_vec(&wire).map_err(io::Error::other)?;
        self.messages.lock().unwrap().push(decoded);
        Ok(())
    }

    async fn write_raw(&self, wire: Vec<u8>) -> io::Result<()> {
        self.before_write().await?;
        self.frames.lock().unwrap().push(wire);
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        "127.0.0.1:53".parse().unwrap()
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.connection.clone()
    }
}
