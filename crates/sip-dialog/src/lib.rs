// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RFC 3261 dialog bookkeeping for a single Call-ID.
//!
//! A [`Dialog`] owns the ordered transactions of one call, derives the
//! local/remote parties and the dialog state from them, and is the only
//! place in-dialog requests and responses are built. Keeping construction
//! here is what keeps tags, CSeq numbers and branches consistent between
//! the two endpoints.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use sip_dialog::{Dialog, DialogState};
//! use sip_transaction::{RandomIdGenerator, Transaction};
//! # use sip_core::{Request, Response};
//! # let invite: Request = todo!();
//! # let ok: Response = todo!();
//! let tx = Transaction::client(invite).unwrap();
//! let mut dialog: Dialog<()> = Dialog::new(tx, Arc::new(RandomIdGenerator), "UDP").unwrap();
//! dialog.update_on_response(ok).unwrap();
//! assert_eq!(dialog.state(), Some(DialogState::Confirmed));
//! let ack = dialog.create_ack().unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use sip_core::{
    CSeq, MessageError, MessageHeaders, Method, NameAddr, PartyHeader, Request, Response,
    ViaHeader,
};
use sip_transaction::{IdGenerator, Transaction};
use smol_str::SmolStr;
use thiserror::Error;

/// Dialog state per RFC 3261 §12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    /// A provisional response was sent or received on the INVITE.
    Early,
    /// A 2xx answered the INVITE.
    Confirmed,
    /// A 2xx answered a BYE.
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("a dialog must start with an INVITE transaction, got {0}")]
    InitialTransactionNotInvite(Method),
    #[error("{0} requests are not built by the dialog")]
    InvalidMethod(Method),
    #[error("cannot send {method} in dialog state {state:?}")]
    DialogNotEstablished {
        state: Option<DialogState>,
        method: Method,
    },
    #[error("provisional responses can only be built by a server dialog")]
    NotAServerDialog,
    #[error("status code {0} is not provisional")]
    InvalidStatusCode(u16),
    #[error("ACK can only follow a client transaction")]
    AckRequiresClientRole,
    #[error("ACK requires a 2xx response on the last transaction")]
    AckRequiresSuccessResponse,
    #[error("ACK can only follow an INVITE transaction, last was {0}")]
    AckRequiresInviteTransaction(Method),
    #[error("no dialog transition for {code} on {method}")]
    UnsupportedResponse { code: u16, method: Method },
    #[error("transaction for Call-ID {actual} added to dialog {expected}")]
    CallIdMismatch { expected: SmolStr, actual: SmolStr },
    #[error("generated To-tag {0} equals the peer's From-tag")]
    TagCollision(SmolStr),
    #[error("CSeq sequence space exhausted")]
    CSeqExhausted,
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// One SIP dialog, keyed by Call-ID, carrying application data of type `T`.
pub struct Dialog<T> {
    call_id: SmolStr,
    transactions: Vec<Transaction>,
    state: Option<DialogState>,
    application_data: Option<T>,
    ids: Arc<dyn IdGenerator>,
    transport: SmolStr,
    last_local_cseq: Option<u32>,
}

impl<T: fmt::Debug> fmt::Debug for Dialog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialog")
            .field("call_id", &self.call_id)
            .field("state", &self.state)
            .field("is_server", &self.is_server())
            .field("transactions", &self.transactions.len())
            .field("application_data", &self.application_data)
            .finish_non_exhaustive()
    }
}

impl<T> Dialog<T> {
    /// Creates a dialog from its INVITE transaction.
    ///
    /// `via_transport` is the Via transport token (`UDP`, `TCP`) of requests
    /// a server dialog originates.
    pub fn new(
        initial: Transaction,
        ids: Arc<dyn IdGenerator>,
        via_transport: &str,
    ) -> Result<Self, DialogError> {
        if initial.method() != &Method::Invite {
            return Err(DialogError::InitialTransactionNotInvite(
                initial.method().clone(),
            ));
        }
        Ok(Self {
            call_id: SmolStr::new(initial.original_request().call_id()),
            transactions: vec![initial],
            state: None,
            application_data: None,
            ids,
            transport: SmolStr::new(via_transport),
            last_local_cseq: None,
        })
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// `None` until the first response on the INVITE is sent or received.
    pub fn state(&self) -> Option<DialogState> {
        self.state
    }

    /// True when the INVITE was received rather than sent.
    pub fn is_server(&self) -> bool {
        self.initial_transaction().is_server()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn initial_transaction(&self) -> &Transaction {
        &self.transactions[0]
    }

    fn last_transaction(&self) -> &Transaction {
        // a dialog always holds at least its INVITE transaction
        &self.transactions[self.transactions.len() - 1]
    }

    /// The request that created the dialog.
    pub fn invite(&self) -> &Request {
        self.initial_transaction().original_request()
    }

    /// Original request of the most recent transaction.
    pub fn last_request(&self) -> &Request {
        self.last_transaction().original_request()
    }

    /// Our own address: To of a received INVITE, From of a sent one.
    pub fn local_party(&self) -> &NameAddr {
        let invite = self.invite();
        if self.is_server() {
            &invite.to().addr
        } else {
            &invite.from().addr
        }
    }

    pub fn remote_party(&self) -> &NameAddr {
        let invite = self.invite();
        if self.is_server() {
            &invite.from().addr
        } else {
            &invite.to().addr
        }
    }

    pub fn application_data(&self) -> Option<&T> {
        self.application_data.as_ref()
    }

    pub fn application_data_mut(&mut self) -> Option<&mut T> {
        self.application_data.as_mut()
    }

    /// Stores application data, returning the previous value.
    pub fn set_application_data(&mut self, data: T) -> Option<T> {
        self.application_data.replace(data)
    }

    /// Records a response on the last transaction and advances the state.
    ///
    /// The response is only recorded when it maps onto a state transition.
    pub fn update_on_response(&mut self, response: Response) -> Result<&mut Self, DialogError> {
        let method = self.last_transaction().method().clone();
        let code = response.code();
        let next = match (code, &method) {
            (100..=199, _) => DialogState::Early,
            (200..=299, Method::Invite) => DialogState::Confirmed,
            (200..=299, Method::Bye) => DialogState::Terminated,
            _ => return Err(DialogError::UnsupportedResponse { code, method }),
        };

        if let Some(last) = self.transactions.last_mut() {
            last.add_response(response);
        }
        self.state = Some(next);
        Ok(self)
    }

    /// Appends a follow-up transaction (ACK, BYE) for this Call-ID.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), DialogError> {
        let call_id = transaction.original_request().call_id();
        if call_id != self.call_id {
            return Err(DialogError::CallIdMismatch {
                expected: self.call_id.clone(),
                actual: SmolStr::new(call_id),
            });
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Builds the next in-dialog request for `method`.
    ///
    /// CSeq is one more than the last transaction's, or than the last request
    /// built here if that is higher, so requests sent without a transaction
    /// (MESSAGE) never reuse a number.
    pub fn create_request(&mut self, method: Method) -> Result<Request, DialogError> {
        if matches!(method, Method::Ack | Method::Prack | Method::Cancel) {
            return Err(DialogError::InvalidMethod(method));
        }

        let state = self.state;
        let allowed = match state {
            None => false,
            Some(DialogState::Terminated) => method == Method::Bye,
            Some(DialogState::Early) => !(self.is_server() && method == Method::Bye),
            Some(DialogState::Confirmed) => true,
        };
        let invite_response = match self.initial_transaction().last_response() {
            Some(response) if allowed => response,
            _ => return Err(DialogError::DialogNotEstablished { state, method }),
        };

        let (from, to, via) = if self.is_server() {
            let local = self.local_party();
            let from = PartyHeader::new(local.clone(), invite_response.to().tag.clone());
            let to = PartyHeader::new(
                self.remote_party().clone(),
                invite_response.from().tag.clone(),
            );
            let via = ViaHeader::new(
                self.transport.clone(),
                local.uri.host.clone(),
                local.uri.port,
                self.ids.next_branch(),
            );
            (from, to, via)
        } else {
            let via = self.invite().top_via().with_branch(self.ids.next_branch());
            (
                invite_response.from().clone(),
                invite_response.to().clone(),
                via,
            )
        };

        let last_seq = self.last_request().cseq().seq();
        let base = self.last_local_cseq.map_or(last_seq, |seq| seq.max(last_seq));
        let seq = base.checked_add(1).ok_or(DialogError::CSeqExhausted)?;
        let cseq = CSeq::new(seq, method.clone())?;

        let headers = MessageHeaders::new(vec![via], from, to, self.call_id.clone(), cseq);
        let request = Request::new(method, self.remote_party().uri.clone(), headers)?;
        self.last_local_cseq = Some(seq);
        Ok(request)
    }

    /// Builds a 1xx for the INVITE of a server dialog.
    pub fn create_provisional_response(&self, code: u16) -> Result<Response, DialogError> {
        if !self.is_server() {
            return Err(DialogError::NotAServerDialog);
        }
        if !(100..=199).contains(&code) {
            return Err(DialogError::InvalidStatusCode(code));
        }
        Ok(self.invite().create_response(code)?)
    }

    /// Builds a 200 OK for the last request in the dialog.
    ///
    /// When that request is the INVITE, the response gets a To-tag from
    /// `tag_supplier` and a Contact with the local party.
    pub fn create_success_response<F>(&self, tag_supplier: F) -> Result<Response, DialogError>
    where
        F: FnOnce() -> SmolStr,
    {
        let request = self.last_request();
        let mut response = request.create_response(200)?;
        if request.method() == &Method::Invite {
            let tag = tag_supplier();
            if request.from().tag() == Some(tag.as_str()) {
                return Err(DialogError::TagCollision(tag));
            }
            response.set_to_tag(tag);
            response.set_contact(self.local_party().clone());
        }
        Ok(response)
    }

    /// Builds the ACK for a 2xx received on the INVITE (RFC 3261 §13.2.2.4).
    pub fn create_ack(&self) -> Result<Request, DialogError> {
        let last = self.last_transaction();
        if last.is_server() {
            return Err(DialogError::AckRequiresClientRole);
        }
        let response = match last.last_response() {
            Some(response) if response.status().is_success() => response,
            _ => return Err(DialogError::AckRequiresSuccessResponse),
        };
        if last.method() != &Method::Invite {
            return Err(DialogError::AckRequiresInviteTransaction(
                last.method().clone(),
            ));
        }

        let invite = last.original_request();
        let cseq = CSeq::new(invite.cseq().seq(), Method::Ack)?;
        let via = invite.top_via().with_branch(self.ids.next_branch());
        let headers = MessageHeaders::new(
            vec![via],
            invite.from().clone(),
            response.to().clone(),
            invite.call_id(),
            cseq,
        );
        Ok(Request::new(Method::Ack, invite.uri().clone(), headers)?)
    }
}
