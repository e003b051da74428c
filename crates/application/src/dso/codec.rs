use super::DsoError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const DSO_OPCODE: u8 = 6;

const HEADER_LEN: usize = 12;
const TLV_HEADER_LEN: usize = 4;

const TYPE_KEEPALIVE: u16 = 1;
const TYPE_RETRY_DELAY: u16 = 2;
const TYPE_PADDING: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsoTlv {
    /// Inactivity timeout and keepalive interval, in milliseconds.
    KeepAlive { inactivity_ms: u32, interval_ms: u32 },
    /// Ask the client to go away and not come back for this many
    /// milliseconds.
    RetryDelay(u32),
    /// Encryption padding of the given length.
    Padding(u16),
    Unknown { tlv_type: u16, data: Bytes },
}

impl DsoTlv {
    pub fn tlv_type(&self) -> u16 {
        match self {
            Self::KeepAlive { .. } => TYPE_KEEPALIVE,
            Self::RetryDelay(_) => TYPE_RETRY_DELAY,
            Self::Padding(_) => TYPE_PADDING,
            Self::Unknown { tlv_type, .. } => *tlv_type,
        }
    }

    fn value_len(&self) -> usize {
        match self {
            Self::KeepAlive { .. } => 8,
            Self::RetryDelay(_) => 4,
            Self::Padding(len) => usize::from(*len),
            Self::Unknown { data, .. } => data.len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<(), DsoError> {
        let len = u16::try_from(self.value_len())
            .map_err(|_| DsoError::Encode(format!("TLV {} too long", self.tlv_type())))?;
        buf.put_u16(self.tlv_type());
        buf.put_u16(len);
        match self {
            Self::KeepAlive {
                inactivity_ms,
                interval_ms,
            } => {
                buf.put_u32(*inactivity_ms);
                buf.put_u32(*interval_ms);
            }
            Self::RetryDelay(delay) => buf.put_u32(*delay),
            Self::Padding(len) => buf.put_bytes(0, usize::from(*len)),
            Self::Unknown { data, .. } => buf.put_slice(data),
        }
        Ok(())
    }

    fn decode(tlv_type: u16, mut value: Bytes) -> Result<Self, DsoError> {
        let expect = |want: usize, value: &Bytes| {
            if value.len() == want {
                Ok(())
            } else {
                Err(DsoError::Malformed(format!(
                    "TLV {tlv_type} has length {}, expected {want}",
                    value.len()
                )))
            }
        };
        match tlv_type {
            TYPE_KEEPALIVE => {
                expect(8, &value)?;
                Ok(Self::KeepAlive {
                    inactivity_ms: value.get_u32(),
                    interval_ms: value.get_u32(),
                })
            }
            TYPE_RETRY_DELAY => {
                expect(4, &value)?;
                Ok(Self::RetryDelay(value.get_u32()))
            }
            // Length fits: it came from a u16 field.
            TYPE_PADDING => Ok(Self::Padding(value.len() as u16)),
            _ => Ok(Self::Unknown {
                tlv_type,
                data: value,
            }),
        }
    }
}

/// A decoded DSO message.
///
/// The kind follows from the header: responses have QR set, requests carry
/// a non-zero id and unidirectional messages an id of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsoMessage {
    pub id: u16,
    pub response: bool,
    /// Four-bit header RCODE; zero on requests.
    pub rcode: u8,
    pub tlvs: Vec<DsoTlv>,
}

impl DsoMessage {
    pub fn request(id: u16, tlvs: Vec<DsoTlv>) -> Self {
        Self {
            id,
            response: false,
            rcode: 0,
            tlvs,
        }
    }

    pub fn unidirectional(tlvs: Vec<DsoTlv>) -> Self {
        Self::request(0, tlvs)
    }

    /// Response to `request` carrying `rcode` (low four bits only).
    pub fn response_to(request: &DsoMessage, rcode: u8, tlvs: Vec<DsoTlv>) -> Self {
        Self {
            id: request.id,
            response: true,
            rcode: rcode & 0x0f,
            tlvs,
        }
    }

    pub fn is_unidirectional(&self) -> bool {
        !self.response && self.id == 0
    }

    pub fn is_success(&self) -> bool {
        self.rcode == 0
    }

    /// The first TLV names the operation.
    pub fn primary(&self) -> Option<&DsoTlv> {
        self.tlvs.first()
    }

    pub fn has_keepalive(&self) -> bool {
        self.tlvs
            .iter()
            .any(|tlv| matches!(tlv, DsoTlv::KeepAlive { .. }))
    }

    pub fn encode(&self) -> Result<Vec<u8>, DsoError> {
        let body: usize = self
            .tlvs
            .iter()
            .map(|tlv| TLV_HEADER_LEN + tlv.value_len())
            .sum();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + body);

        buf.put_u16(self.id);
        let qr = if self.response { 0x80 } else { 0 };
        buf.put_u8(qr | (DSO_OPCODE << 3));
        buf.put_u8(self.rcode & 0x0f);
        buf.put_bytes(0, 8);

        for tlv in &self.tlvs {
            tlv.encode(&mut buf)?;
        }
        Ok(buf.to_vec())
    }

    pub fn decode(packet: &[u8]) -> Result<Self, DsoError> {
        if packet.len() < HEADER_LEN {
            return Err(DsoError::Malformed("short header".to_string()));
        }
        if opcode(packet) != Some(DSO_OPCODE) {
            return Err(DsoError::Malformed("not a DSO message".to_string()));
        }
        if packet[4..HEADER_LEN].iter().any(|b| *b != 0) {
            return Err(DsoError::Malformed(
                "section counts must be zero".to_string(),
            ));
        }

        let mut buf = Bytes::copy_from_slice(packet);
        let id = buf.get_u16();
        let flags = buf.get_u8();
        let rcode = buf.get_u8() & 0x0f;
        buf.advance(8);

        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            if buf.remaining() < TLV_HEADER_LEN {
                return Err(DsoError::Malformed("truncated TLV header".to_string()));
            }
            let tlv_type = buf.get_u16();
            let len = usize::from(buf.get_u16());
            if buf.remaining() < len {
                return Err(DsoError::Malformed(format!("truncated TLV {tlv_type}")));
            }
            tlvs.push(DsoTlv::decode(tlv_type, buf.split_to(len))?);
        }

        Ok(Self {
            id,
            response: flags & 0x80 != 0,
            rcode,
            tlvs,
        })
    }
}

/// Opcode of a raw DNS message, if the header is long enough to hold one.
pub fn opcode(packet: &[u8]) -> Option<u8> {
    packet.get(2).map(|flags| (flags >> 3) & 0x0f)
}
