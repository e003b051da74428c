//! Replies the server writes on its own behalf.

use hickory_proto::op::{Edns, Message, MessageType, ResponseCode};

/// Empty response mirroring the request header and question.
pub fn response_for(req: &Message) -> Message {
    let mut msg = Message::new(req.id(), MessageType::Response, req.op_code());
    msg.set_recursion_desired(req.recursion_desired());
    msg.set_checking_disabled(req.checking_disabled());
    for query in req.queries() {
        msg.add_query(query.clone());
    }
    msg
}

pub fn error_reply(req: &Message, rcode: ResponseCode) -> Message {
    let mut msg = response_for(req);
    msg.set_response_code(rcode);
    msg
}

/// SERVFAIL for a packet that could not be parsed; only the id survives.
pub fn servfail_for_id(id: u16) -> Message {
    let mut msg = Message::new(id, MessageType::Response, hickory_proto::op::OpCode::Query);
    msg.set_response_code(ResponseCode::ServFail);
    msg
}

/// Version negotiation failure (RFC 6891 section 6.1.3): BADVERS with an
/// OPT record of version 0 and no question.
pub fn badvers_reply(req: &Message, payload: u16) -> Message {
    let mut msg = Message::new(req.id(), MessageType::Response, req.op_code());
    let mut edns = Edns::new();
    edns.set_version(0);
    edns.set_max_payload(payload);
    msg.set_edns(edns);
    msg.set_response_code(ResponseCode::BADVERS);
    msg
}

/// Low four bits of `rcode`, as carried in the header.
pub fn header_rcode(rcode: ResponseCode) -> u8 {
    (u16::from(rcode) & 0x0f) as u8
}
