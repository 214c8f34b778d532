// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test fixtures for the user-agent crates.
//!
//! Provides deterministic id generators, a transport that records what it is
//! asked to send, and canned INVITE/response builders.
//!
//! # Example
//! ```
//! use sip_testkit::build_invite;
//! let invite = build_invite("sip:bob@127.0.0.1:5070", "z9hG4bKtest", "call-1");
//! assert_eq!(invite.method().as_str(), "INVITE");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use sip_core::{
    CSeq, MessageHeaders, Method, NameAddr, PartyHeader, Request, Response, SipMessage, SipUri,
    ViaHeader,
};
use sip_parse::{Codec, SipCodec};
use sip_transaction::IdGenerator;
use sip_transport::{Transport, TransportError};
use smol_str::SmolStr;

/// Returns the same id on every call.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator(SmolStr);

impl FixedIdGenerator {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

impl IdGenerator for FixedIdGenerator {
    fn next_id(&self) -> SmolStr {
        self.0.clone()
    }
}

/// Returns `{prefix}-1`, `{prefix}-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: SmolStr,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<SmolStr>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> SmolStr {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        SmolStr::new(format!("{}-{}", self.prefix, n))
    }
}

/// One payload handed to [`RecordingTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub payload: Bytes,
    pub host: SmolStr,
    pub port: u16,
}

impl SentDatagram {
    /// Decodes the payload with the default codec.
    pub fn message(&self) -> SipMessage {
        SipCodec::default()
            .decode(&self.payload)
            .expect("recorded payload decodes")
    }

    pub fn request(&self) -> Request {
        match self.message() {
            SipMessage::Request(req) => req,
            SipMessage::Response(resp) => panic!("expected request, got {}", resp.code()),
        }
    }

    pub fn response(&self) -> Response {
        match self.message() {
            SipMessage::Response(resp) => resp,
            SipMessage::Request(req) => panic!("expected response, got {}", req.method()),
        }
    }
}

/// Transport that keeps every send in memory instead of touching the network.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentDatagram>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentDatagram> {
        self.sent.lock().last().cloned()
    }

    /// Drains the recorded sends.
    pub fn take(&self) -> Vec<SentDatagram> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, payload: Bytes, host: &str, port: u16) -> Result<(), TransportError> {
        self.sent.lock().push(SentDatagram {
            payload,
            host: SmolStr::new(host),
            port,
        });
        Ok(())
    }
}

/// Constructs a request from `alice@127.0.0.1:5060` to `uri`, with CSeq 1
/// and no To-tag.
pub fn build_request(method: Method, uri: &str, branch: &str, call_id: &str) -> Request {
    let target = SipUri::parse(uri).expect("valid request uri");
    let via = ViaHeader::new("UDP", "127.0.0.1", Some(5060), branch);
    let from = PartyHeader::new(alice(), Some(SmolStr::new("initiator-1234")));
    let to = PartyHeader::new(NameAddr::new(target.clone()), None);
    let cseq = CSeq::new(1, method.clone()).expect("non-zero cseq");
    let headers = MessageHeaders::new(vec![via], from, to, call_id, cseq);
    Request::new(method, target, headers).expect("via present")
}

/// Constructs an INVITE from `alice@127.0.0.1:5060` to `uri`.
pub fn build_invite(uri: &str, branch: &str, call_id: &str) -> Request {
    let mut request = build_request(Method::Invite, uri, branch, call_id);
    request.set_contact(alice());
    request
}

/// Constructs an in-dialog request alice sends once `invite` is answered
/// with `to_tag`.
pub fn build_in_dialog(
    invite: &Request,
    method: Method,
    seq: u32,
    to_tag: &str,
    branch: &str,
) -> Request {
    let via = invite.top_via().with_branch(branch);
    let cseq = CSeq::new(seq, method.clone()).expect("non-zero cseq");
    let headers = MessageHeaders::new(
        vec![via],
        invite.from().clone(),
        invite.to().with_tag(to_tag),
        invite.call_id(),
        cseq,
    );
    Request::new(method, invite.uri().clone(), headers).expect("via present")
}

/// Constructs the ACK for a 2xx that carried `to_tag`.
pub fn build_ack(invite: &Request, to_tag: &str, branch: &str) -> Request {
    build_in_dialog(invite, Method::Ack, invite.cseq().seq(), to_tag, branch)
}

fn alice() -> NameAddr {
    NameAddr::new(
        SipUri::new("127.0.0.1")
            .with_user("alice")
            .with_port(5060),
    )
}

/// Constructs a response to `request`, adding `to_tag` when given.
pub fn build_response(request: &Request, code: u16, to_tag: Option<&str>) -> Response {
    let mut response = request.create_response(code).expect("valid status code");
    if let Some(tag) = to_tag {
        response.set_to_tag(tag);
    }
    response
}

/// Encodes a message with the default codec.
pub fn encode(message: impl Into<SipMessage>) -> Bytes {
    SipCodec::default().encode(&message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_increment() {
        let ids = SequentialIdGenerator::new("id");
        assert_eq!(ids.next_id(), "id-1");
        assert_eq!(ids.next_id(), "id-2");
        assert_eq!(ids.next_branch(), "z9hG4bKid-3");
    }

    #[test]
    fn recording_transport_keeps_order() {
        let transport = RecordingTransport::new();
        transport
            .send(Bytes::from_static(b"a"), "h1", 1)
            .unwrap();
        transport
            .send(Bytes::from_static(b"b"), "h2", 2)
            .unwrap();
        assert_eq!(transport.len(), 2);
        assert_eq!(transport.last().unwrap().host, "h2");
        assert_eq!(transport.take().len(), 2);
        assert!(transport.is_empty());
    }

    #[test]
    fn canned_invite_survives_codec() {
        let invite = build_invite("sip:bob@127.0.0.1:5070", "z9hG4bKx", "c1");
        let sent = SentDatagram {
            payload: encode(invite.clone()),
            host: SmolStr::new("127.0.0.1"),
            port: 5070,
        };
        assert_eq!(sent.request(), invite);
    }
}
