// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use sip_core::{CSeq, MessageHeaders, Method, PartyHeader, Request, SipUri, ViaHeader};
use sip_transaction::{
    IdGenerator, Transaction, TransactionError, TransactionRole, TransactionState,
};
use smol_str::SmolStr;

struct Fixed;

impl IdGenerator for Fixed {
    fn next_id(&self) -> SmolStr {
        SmolStr::new("mockId")
    }
}

fn sample_request(method: Method) -> Request {
    let headers = MessageHeaders::new(
        vec![ViaHeader::new("UDP", "127.0.0.1", Some(5080), Fixed.next_branch())],
        PartyHeader::parse("<sip:Client@127.0.0.1:5080>;tag=initiator-mockId").unwrap(),
        PartyHeader::parse("<sip:Server@127.0.0.2:5082>").unwrap(),
        "mockId",
        CSeq::new(1, method.clone()).unwrap(),
    );
    Request::new(method, SipUri::parse("sip:Server@127.0.0.2:5082").unwrap(), headers).unwrap()
}

// ==========================
// Client Transactions
// ==========================

#[test]
fn client_invite_starts_calling() {
    let tx = Transaction::client(sample_request(Method::Invite)).unwrap();
    assert_eq!(tx.role(), TransactionRole::Client);
    assert!(!tx.is_server());
    assert_eq!(tx.state(), TransactionState::Calling);
    assert_eq!(tx.branch_id(), "z9hG4bKmockId");
}

#[test]
fn client_message_is_not_tracked() {
    assert!(matches!(
        Transaction::client(sample_request(Method::Message)),
        Err(TransactionError::UnsupportedMethod {
            role: TransactionRole::Client,
            method: Method::Message,
        })
    ));
}

// ==========================
// Server Transactions
// ==========================

#[test]
fn server_ack_starts_confirmed() {
    let tx = Transaction::server(sample_request(Method::Ack)).unwrap();
    assert!(tx.is_server());
    assert_eq!(tx.state(), TransactionState::Confirmed);
    assert_eq!(tx.method(), &Method::Ack);
}

#[test]
fn server_invite_keeps_original_request() {
    let invite = sample_request(Method::Invite);
    let mut tx = Transaction::server(invite.clone()).unwrap();
    assert_eq!(tx.original_request(), &invite);
    assert_eq!(tx.state(), TransactionState::Proceeding);

    let ringing = invite.create_response(180).unwrap();
    tx.add_response(ringing.clone());
    assert_eq!(tx.last_response(), Some(&ringing));
}

#[test]
fn unsupported_method_error_names_method() {
    let err = Transaction::server(sample_request(Method::Cancel)).unwrap_err();
    assert_eq!(err.to_string(), "no Server transaction is defined for CANCEL");
}
