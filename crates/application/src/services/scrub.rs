use crate::ports::{ConnectionInfo, ResponseWriter};
use crate::request::{Protocol, Request, MIN_UDP_PAYLOAD};
use async_trait::async_trait;
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::Record;
use std::io;
use std::net::SocketAddr;
use tracing::debug;

/// Wraps the connection writer for one query and fits every reply to the
/// client's buffer before it goes out.
pub struct ScrubWriter<'a> {
    inner: &'a dyn ResponseWriter,
    max_size: usize,
    datagram: bool,
    edns_payload: Option<u16>,
}

impl<'a> ScrubWriter<'a> {
    pub fn new(inner: &'a dyn ResponseWriter, req: &Request) -> Self {
        Self {
            inner,
            max_size: req.max_reply_size(),
            datagram: req.protocol.is_datagram(),
            edns_payload: req.edns_payload(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[async_trait]
impl ResponseWriter for ScrubWriter<'_> {
    async fn write_msg(&self, mut msg: Message) -> io::Result<()> {
        if let Some(payload) = self.edns_payload {
            if msg.extensions().is_none() {
                let mut edns = Edns::new();
                edns.set_max_payload(payload.max(MIN_UDP_PAYLOAD));
                msg.set_edns(edns);
            }
        }
        if fit_reply(&mut msg, self.max_size, self.datagram)? {
            debug!(id = msg.id(), max = self.max_size, "reply truncated");
        }
        self.inner.write_msg(msg).await
    }

    async fn write_raw(&self, wire: Vec<u8>) -> io::Result<()> {
        self.inner.write_raw(wire).await
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr()
    }

    fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr()
    }

    fn protocol(&self) -> Protocol {
        self.inner.protocol()
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.inner.connection()
    }
}

#[derive(Clone, Copy)]
enum Section {
    Answer,
    Authority,
}

/// Shrink `msg` until it encodes in at most `max` bytes.
///
/// Additional records go first, then authority records, then answers,
/// always from the end of the section. TC is set on datagram replies that
/// lost authority or answer records. Returns whether anything was dropped.
pub fn fit_reply(msg: &mut Message, max: usize, datagram: bool) -> io::Result<bool> {
    if encoded_len(msg)? <= max {
        return Ok(false);
    }

    msg.take_additionals();
    if encoded_len(msg)? <= max {
        return Ok(true);
    }

    let mut lost_records = shrink(msg, Section::Authority, max)?;
    if encoded_len(msg)? > max {
        lost_records |= shrink(msg, Section::Answer, max)?;
    }

    if datagram && lost_records {
        msg.set_truncated(true);
    }
    Ok(true)
}

/// Keep the longest prefix of `section` that lets `msg` fit.
fn shrink(msg: &mut Message, section: Section, max: usize) -> io::Result<bool> {
    let records = take(msg, section);
    if records.is_empty() {
        return Ok(false);
    }

    let (mut lo, mut hi) = (0, records.len());
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        put(msg, section, &records[..mid]);
        let fits = encoded_len(msg)? <= max;
        take(msg, section);
        if fits {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    put(msg, section, &records[..lo]);
    Ok(lo < records.len())
}

fn take(msg: &mut Message, section: Section) -> Vec<Record> {
    match section {
        Section::Answer => msg.take_answers(),
        Section::Authority => msg.take_name_servers(),
    }
}

fn put(msg: &mut Message, section: Section, records: &[Record]) {
    match section {
        Section::Answer => msg.add_answers(records.iter().cloned()),
        Section::Authority => msg.add_name_servers(records.iter().cloned()),
    };
}

fn encoded_len(msg: &Message) -> io::Result<usize> {
    msg.to_vec().map(|wire| wire.len()).map_err(io::Error::other)
}
