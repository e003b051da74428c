use crate::dso::{opcode, DsoMessage, DSO_OPCODE};
use hickory_proto::op::Message;
use hickory_proto::rr::{DNSClass, RecordType};
use std::fmt;
use std::net::SocketAddr;
use zonemux_domain::validators::fqdn;

/// Largest UDP reply when the client advertises no EDNS buffer.
pub const MIN_UDP_PAYLOAD: u16 = 512;
/// Largest reply on a stream transport.
pub const MAX_STREAM_PAYLOAD: u16 = u16::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    pub fn is_datagram(&self) -> bool {
        matches!(self, Self::Udp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of TSIG verification for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TsigStatus {
    #[default]
    Unsigned,
    Verified {
        key: String,
    },
    Failed {
        key: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum RequestKind {
    Query(Message),
    Stateful(DsoMessage),
}

/// A message that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Id recovered from the raw header, if it was long enough.
    pub id: Option<u16>,
    pub reason: String,
}

/// One decoded client message plus where it came from.
#[derive(Debug, Clone)]
pub struct Request {
    pub remote: SocketAddr,
    pub protocol: Protocol,
    pub kind: RequestKind,
    pub tsig: TsigStatus,
}

impl Request {
    pub fn new(message: Message, remote: SocketAddr, protocol: Protocol) -> Self {
        Self {
            remote,
            protocol,
            kind: RequestKind::Query(message),
            tsig: TsigStatus::Unsigned,
        }
    }

    pub fn stateful(message: DsoMessage, remote: SocketAddr, protocol: Protocol) -> Self {
        Self {
            remote,
            protocol,
            kind: RequestKind::Stateful(message),
            tsig: TsigStatus::Unsigned,
        }
    }

    /// Decode a raw packet. Stateful (opcode 6) messages go through the DSO
    /// codec, everything else through the DNS message parser.
    pub fn decode(
        packet: &[u8],
        remote: SocketAddr,
        protocol: Protocol,
    ) -> Result<Self, DecodeError> {
        let id = packet.get(..2).map(|b| u16::from_be_bytes([b[0], b[1]]));
        let fail = |reason: String| DecodeError { id, reason };

        if opcode(packet) == Some(DSO_OPCODE) {
            let msg = DsoMessage::decode(packet).map_err(|e| fail(e.to_string()))?;
            return Ok(Self::stateful(msg, remote, protocol));
        }

        let msg = Message::from_vec(packet).map_err(|e| fail(e.to_string()))?;
        Ok(Self::new(msg, remote, protocol))
    }

    pub fn with_tsig(mut self, tsig: TsigStatus) -> Self {
        self.tsig = tsig;
        self
    }

    pub fn id(&self) -> u16 {
        match &self.kind {
            RequestKind::Query(msg) => msg.id(),
            RequestKind::Stateful(msg) => msg.id,
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self.kind, RequestKind::Stateful(_))
    }

    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            RequestKind::Query(msg) => Some(msg),
            RequestKind::Stateful(_) => None,
        }
    }

    pub fn dso(&self) -> Option<&DsoMessage> {
        match &self.kind {
            RequestKind::Stateful(msg) => Some(msg),
            RequestKind::Query(_) => None,
        }
    }

    /// Lowercased, dot-terminated name of the first question. Stateful
    /// messages have no question and are routed under the root.
    pub fn qname(&self) -> String {
        self.message()
            .and_then(|msg| msg.queries().first())
            .map(|q| fqdn(&q.name().to_ascii()))
            .unwrap_or_else(|| ".".to_string())
    }

    pub fn qtype(&self) -> Option<RecordType> {
        self.message()
            .and_then(|msg| msg.queries().first())
            .map(|q| q.query_type())
    }

    pub fn qclass(&self) -> Option<DNSClass> {
        self.message()
            .and_then(|msg| msg.queries().first())
            .map(|q| q.query_class())
    }

    pub fn question_count(&self) -> usize {
        self.message().map_or(0, |msg| msg.queries().len())
    }

    /// EDNS version the client asked for, if it sent an OPT record.
    pub fn edns_version(&self) -> Option<u8> {
        self.message()
            .and_then(|msg| msg.extensions().as_ref())
            .map(|edns| edns.version())
    }

    /// Buffer size the client advertised via EDNS, if any.
    pub fn edns_payload(&self) -> Option<u16> {
        self.message()
            .and_then(|msg| msg.extensions().as_ref())
            .map(|edns| edns.max_payload())
    }

    /// Largest reply this client can take on this transport.
    pub fn max_reply_size(&self) -> usize {
        match self.protocol {
            Protocol::Tcp => usize::from(MAX_STREAM_PAYLOAD),
            Protocol::Udp => usize::from(
                self.edns_payload()
                    .unwrap_or(MIN_UDP_PAYLOAD)
                    .max(MIN_UDP_PAYLOAD),
            ),
        }
    }
}
