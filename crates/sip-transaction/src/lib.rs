// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transaction bookkeeping for the user agent.
//!
//! A [`Transaction`] records one request, the ordered responses sent or
//! received for it, its branch and an initial state derived from the role
//! and method. States are observational: nothing here runs RFC 3261 timers
//! or retransmits.

mod id;

use sip_core::{Method, Request, Response};
use smol_str::SmolStr;
use thiserror::Error;

pub use id::{IdGenerator, RandomIdGenerator};

/// Which side of the exchange created the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionRole {
    Client,
    Server,
}

/// RFC 3261 §17 state a transaction starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Calling,
    Trying,
    Proceeding,
    Confirmed,
}

impl TransactionState {
    /// Initial state for `role` and `method`, or `None` for methods the
    /// user agent does not track.
    pub fn initial(role: TransactionRole, method: &Method) -> Option<Self> {
        use TransactionRole::*;
        match (role, method) {
            (Client, Method::Invite) => Some(Self::Calling),
            (Client, Method::Ack) | (Client, Method::Bye) => Some(Self::Trying),
            (Server, Method::Invite) => Some(Self::Proceeding),
            (Server, Method::Ack) => Some(Self::Confirmed),
            (Server, Method::Bye) => Some(Self::Trying),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("no {role:?} transaction is defined for {method}")]
    UnsupportedMethod { role: TransactionRole, method: Method },
}

/// One request and the responses seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    role: TransactionRole,
    branch_id: SmolStr,
    request: Request,
    responses: Vec<Response>,
    state: TransactionState,
}

impl Transaction {
    /// Creates a transaction, taking the branch from the topmost Via.
    pub fn new(role: TransactionRole, request: Request) -> Result<Self, TransactionError> {
        let state = TransactionState::initial(role, request.method()).ok_or_else(|| {
            TransactionError::UnsupportedMethod {
                role,
                method: request.method().clone(),
            }
        })?;
        Ok(Self {
            role,
            branch_id: request.top_via().branch.clone(),
            request,
            responses: Vec::new(),
            state,
        })
    }

    pub fn client(request: Request) -> Result<Self, TransactionError> {
        Self::new(TransactionRole::Client, request)
    }

    pub fn server(request: Request) -> Result<Self, TransactionError> {
        Self::new(TransactionRole::Server, request)
    }

    pub fn role(&self) -> TransactionRole {
        self.role
    }

    pub fn is_server(&self) -> bool {
        self.role == TransactionRole::Server
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    pub fn original_request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn add_response(&mut self, response: Response) {
        self.responses.push(response);
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.responses.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_core::{CSeq, MessageHeaders, PartyHeader, SipUri, ViaHeader};

    fn request(method: Method, branch: &str) -> Request {
        let headers = MessageHeaders::new(
            vec![
                ViaHeader::new("UDP", "127.0.0.1", Some(5080), branch),
                ViaHeader::new("UDP", "10.0.0.9", None, "z9hG4bKlower"),
            ],
            PartyHeader::parse("<sip:a@127.0.0.1>;tag=1").unwrap(),
            PartyHeader::parse("<sip:b@127.0.0.2>").unwrap(),
            "call",
            CSeq::new(1, method.clone()).unwrap(),
        );
        Request::new(method, SipUri::parse("sip:b@127.0.0.2").unwrap(), headers).unwrap()
    }

    #[test]
    fn branch_comes_from_top_via() {
        let tx = Transaction::client(request(Method::Invite, "z9hG4bKtop")).unwrap();
        assert_eq!(tx.branch_id(), "z9hG4bKtop");
    }

    #[test]
    fn initial_state_table() {
        let cases = [
            (TransactionRole::Client, Method::Invite, TransactionState::Calling),
            (TransactionRole::Client, Method::Ack, TransactionState::Trying),
            (TransactionRole::Client, Method::Bye, TransactionState::Trying),
            (TransactionRole::Server, Method::Invite, TransactionState::Proceeding),
            (TransactionRole::Server, Method::Ack, TransactionState::Confirmed),
            (TransactionRole::Server, Method::Bye, TransactionState::Trying),
        ];
        for (role, method, expected) in cases {
            let tx = Transaction::new(role, request(method.clone(), "z9hG4bK1")).unwrap();
            assert_eq!(tx.state(), expected, "{:?} {}", role, method);
        }
    }

    #[test]
    fn untracked_methods_are_rejected() {
        for method in [Method::Message, Method::Cancel, Method::Options, Method::Prack] {
            let err = Transaction::server(request(method.clone(), "z9hG4bK1")).unwrap_err();
            assert_eq!(
                err,
                TransactionError::UnsupportedMethod {
                    role: TransactionRole::Server,
                    method,
                }
            );
        }
    }

    #[test]
    fn responses_are_appended_in_order() {
        let req = request(Method::Invite, "z9hG4bK1");
        let mut tx = Transaction::client(req.clone()).unwrap();
        assert!(tx.last_response().is_none());

        tx.add_response(req.create_response(100).unwrap());
        tx.add_response(req.create_response(200).unwrap());
        assert_eq!(tx.responses().len(), 2);
        assert_eq!(tx.last_response().map(|r| r.code()), Some(200));
        // state is never advanced by responses
        assert_eq!(tx.state(), TransactionState::Calling);
    }

    #[test]
    fn generated_branch_has_magic_cookie() {
        let branch = RandomIdGenerator.next_branch();
        assert!(branch.starts_with("z9hG4bK"));
        assert_eq!(branch.len(), 7 + 16);
    }
}
