// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use sip_core::{
    CSeq, MessageError, MessageHeaders, Method, NameAddr, PartyHeader, Request, Response,
    SipMessage, SipUri, ViaHeader,
};
use sip_dialog::{Dialog, DialogState};
use sip_observe::metrics;
use sip_parse::{Codec, SipCodec};
use sip_transaction::{IdGenerator, RandomIdGenerator, Transaction};
use sip_transport::{Transport, TransportKind};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::{UaError, UserAgentConfig, UserAgentHandler};

const CONTENT_TYPE_TEXT: &str = "application/text";
const CONTENT_TYPE_SDP: &str = "application/sdp";

/// Dialog registry and message dispatch for one user agent.
///
/// The core is synchronous: every operation runs to completion, handing any
/// outbound bytes to the [`Transport`] without waiting. Serialize access by
/// owning it from a single task, as [`UserAgent`](crate::UserAgent) does.
///
/// The core only talks directly to its peer: requests go to the To URI,
/// responses to the topmost Via.
pub struct UserAgentCore<T> {
    config: UserAgentConfig,
    kind: TransportKind,
    dialogs: HashMap<SmolStr, Dialog<T>>,
    codec: Arc<dyn Codec>,
    transport: Arc<dyn Transport>,
    ids: Arc<dyn IdGenerator>,
}

impl<T> UserAgentCore<T> {
    /// Creates a core with the text codec and random identifiers.
    pub fn new(config: UserAgentConfig, transport: Arc<dyn Transport>) -> Result<Self, UaError> {
        Self::with_parts(
            config,
            Arc::new(SipCodec::default()),
            transport,
            Arc::new(RandomIdGenerator),
        )
    }

    pub fn with_parts(
        config: UserAgentConfig,
        codec: Arc<dyn Codec>,
        transport: Arc<dyn Transport>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, UaError> {
        let kind = config.validate()?;
        Ok(Self {
            config,
            kind,
            dialogs: HashMap::new(),
            codec,
            transport,
            ids,
        })
    }

    pub fn config(&self) -> &UserAgentConfig {
        &self.config
    }

    pub fn dialog(&self, call_id: &str) -> Option<&Dialog<T>> {
        self.dialogs.get(call_id)
    }

    pub fn dialog_count(&self) -> usize {
        self.dialogs.len()
    }

    fn find_dialog(&self, call_id: &str) -> Result<&Dialog<T>, UaError> {
        self.dialogs
            .get(call_id)
            .ok_or_else(|| UaError::DialogNotFound(SmolStr::new(call_id)))
    }

    fn find_dialog_mut(&mut self, call_id: &str) -> Result<&mut Dialog<T>, UaError> {
        self.dialogs
            .get_mut(call_id)
            .ok_or_else(|| UaError::DialogNotFound(SmolStr::new(call_id)))
    }

    pub fn application_data(&self, call_id: &str) -> Result<Option<&T>, UaError> {
        Ok(self.find_dialog(call_id)?.application_data())
    }

    pub fn application_data_mut(&mut self, call_id: &str) -> Result<Option<&mut T>, UaError> {
        Ok(self.find_dialog_mut(call_id)?.application_data_mut())
    }

    /// Stores application data on a dialog, returning the previous value.
    pub fn set_application_data(&mut self, call_id: &str, data: T) -> Result<Option<T>, UaError> {
        Ok(self.find_dialog_mut(call_id)?.set_application_data(data))
    }

    // ===========================================
    // Builders
    // ===========================================

    /// Builds an out-of-dialog INVITE from `from_user` at the local binding.
    ///
    /// The INVITE has no dialog yet; it is registered when sent.
    pub fn create_invite(&self, from_user: &str, request_uri: SipUri) -> Result<Request, UaError> {
        let to = PartyHeader::new(NameAddr::new(request_uri.clone()), None);

        let local = NameAddr::new(
            SipUri::new(self.config.host.as_str())
                .with_user(from_user)
                .with_port(self.config.port),
        );
        let tag = SmolStr::new(format!("initiator-{}", self.ids.next_id()));
        let from = PartyHeader::new(local.clone(), Some(tag));

        let via = ViaHeader::new(
            self.kind.via_transport(),
            self.config.host.as_str(),
            Some(self.config.port),
            self.ids.next_branch(),
        );
        let cseq = CSeq::new(1, Method::Invite)?;
        let headers = MessageHeaders::new(vec![via], from, to, self.ids.next_id(), cseq);

        let mut request = Request::new(Method::Invite, request_uri, headers)?;
        request.set_contact(local);
        Ok(request)
    }

    pub fn create_ack(&self, call_id: &str) -> Result<Request, UaError> {
        Ok(self.find_dialog(call_id)?.create_ack()?)
    }

    pub fn create_bye(&mut self, call_id: &str) -> Result<Request, UaError> {
        Ok(self.find_dialog_mut(call_id)?.create_request(Method::Bye)?)
    }

    /// Builds an in-dialog MESSAGE carrying `text`.
    pub fn create_message(&mut self, call_id: &str, text: &str) -> Result<Request, UaError> {
        let mut request = self
            .find_dialog_mut(call_id)?
            .create_request(Method::Message)?;
        request.set_body(CONTENT_TYPE_TEXT, text.to_owned());
        Ok(request)
    }

    pub fn create_trying(&self, call_id: &str) -> Result<Response, UaError> {
        Ok(self
            .find_dialog(call_id)?
            .create_provisional_response(100)?)
    }

    /// Builds a 200 OK for the last request of the dialog.
    pub fn create_ok(&self, call_id: &str) -> Result<Response, UaError> {
        let dialog = self.find_dialog(call_id)?;
        let ids = &self.ids;
        Ok(dialog.create_success_response(|| server_tag(ids.as_ref()))?)
    }

    /// Builds a 200 OK with an SDP answer for the INVITE of the dialog.
    pub fn create_ok_with_sdp(&self, call_id: &str, sdp: &str) -> Result<Response, UaError> {
        let dialog = self.find_dialog(call_id)?;
        let method = dialog.last_request().method();
        if method != &Method::Invite {
            return Err(UaError::SdpRequiresInvite(method.clone()));
        }
        let ids = &self.ids;
        let mut response = dialog.create_success_response(|| server_tag(ids.as_ref()))?;
        response.set_body(CONTENT_TYPE_SDP, sdp.to_owned());
        Ok(response)
    }

    // ===========================================
    // Outbound
    // ===========================================

    /// Sends the request and records a client transaction for it.
    ///
    /// MESSAGE requests are sent without a transaction. Nothing is recorded
    /// unless the transport accepted the request.
    pub fn send_request(&mut self, request: Request) -> Result<(), UaError> {
        let transaction = match request.method() {
            Method::Message => None,
            _ => {
                let transaction = Transaction::client(request.clone())?;
                self.check_dialog_transaction(&transaction)?;
                Some(transaction)
            }
        };
        let target = &request.to().addr.uri;
        let (host, port) = (target.host.clone(), target.port_or_default());
        self.transmit(SipMessage::Request(request), &host, port)?;
        if let Some(transaction) = transaction {
            self.add_dialog_transaction(transaction)?;
        }
        Ok(())
    }

    /// Sends a response and applies it to the dialog it answers.
    ///
    /// A 2xx on a BYE evicts the dialog and fires
    /// [`on_dialog_terminated`](UserAgentHandler::on_dialog_terminated).
    pub fn send_response<H>(&mut self, response: Response, handler: &mut H) -> Result<(), UaError>
    where
        H: UserAgentHandler<T> + ?Sized,
    {
        let via = response.top_via().ok_or(MessageError::MissingVia)?;
        let (host, port) = (via.host.clone(), via.port_or_default());
        self.transmit(SipMessage::Response(response.clone()), &host, port)?;

        if response.cseq().method() == &Method::Message {
            return Ok(());
        }
        if self.apply_response(&response)? == Some(DialogState::Terminated) {
            handler.on_dialog_terminated(self, &response)?;
        }
        Ok(())
    }

    fn transmit(&self, message: SipMessage, host: &str, port: u16) -> Result<(), UaError> {
        let payload = self.codec.encode(&message);
        debug!(
            call_id = message.call_id(),
            %host,
            port,
            "sending {}",
            message.summary()
        );
        trace!("sending\n{}", String::from_utf8_lossy(&payload));
        self.transport.send(payload, host, port)?;
        Ok(())
    }

    // ===========================================
    // Inbound
    // ===========================================

    /// Decodes one datagram and dispatches it.
    ///
    /// A decode failure only affects this datagram.
    pub fn on_incoming_bytes<H>(&mut self, bytes: &[u8], handler: &mut H) -> Result<(), UaError>
    where
        H: UserAgentHandler<T> + ?Sized,
    {
        let message = self.codec.decode(bytes)?;
        trace!("received\n{}", String::from_utf8_lossy(bytes));
        match message {
            SipMessage::Request(request) => self.on_request_received(request, handler),
            SipMessage::Response(response) => self.on_response_received(response, handler),
        }
    }

    pub fn on_request_received<H>(
        &mut self,
        request: Request,
        handler: &mut H,
    ) -> Result<(), UaError>
    where
        H: UserAgentHandler<T> + ?Sized,
    {
        debug!(
            call_id = request.call_id(),
            method = %request.method(),
            from = %request.from(),
            "got request"
        );
        match request.method() {
            Method::Message => return handler.on_message(self, &request),
            Method::Invite | Method::Bye | Method::Ack => {}
            other => return Err(UaError::UnsupportedMethod(other.clone())),
        }

        let transaction = Transaction::server(request.clone())?;
        self.add_dialog_transaction(transaction)?;

        match request.method() {
            Method::Invite => handler.on_invite(self, &request),
            Method::Bye => handler.on_bye(self, &request),
            Method::Ack => handler.on_server_dialog_confirmed(self, &request),
            other => Err(UaError::UnsupportedMethod(other.clone())),
        }
    }

    pub fn on_response_received<H>(
        &mut self,
        response: Response,
        handler: &mut H,
    ) -> Result<(), UaError>
    where
        H: UserAgentHandler<T> + ?Sized,
    {
        debug!(
            call_id = response.call_id(),
            code = response.code(),
            cseq = %response.cseq(),
            "got response"
        );
        if response.cseq().method() == &Method::Message {
            self.find_dialog(response.call_id())?;
            return Ok(());
        }

        match self.apply_response(&response)? {
            Some(DialogState::Confirmed) => handler.on_client_dialog_confirmed(self, &response)?,
            Some(DialogState::Terminated) => handler.on_dialog_terminated(self, &response)?,
            _ => {}
        }
        if response.status().is_provisional() {
            handler.on_provisional_response(self, &response)?;
        }
        Ok(())
    }

    // ===========================================
    // Registry
    // ===========================================

    /// Fails when `transaction` could not be added to the registry: an INVITE
    /// for a tracked Call-ID, or any other method for an unknown one.
    fn check_dialog_transaction(&self, transaction: &Transaction) -> Result<(), UaError> {
        let call_id = transaction.original_request().call_id();
        match (transaction.method(), self.dialogs.contains_key(call_id)) {
            (Method::Invite, true) => Err(UaError::DialogAlreadyExists(SmolStr::new(call_id))),
            (Method::Invite, false) | (_, true) => Ok(()),
            (_, false) => Err(UaError::DialogNotFound(SmolStr::new(call_id))),
        }
    }

    /// Creates the dialog for an INVITE, or appends to an existing one.
    fn add_dialog_transaction(&mut self, transaction: Transaction) -> Result<(), UaError> {
        let call_id = SmolStr::new(transaction.original_request().call_id());
        if transaction.method() != &Method::Invite {
            self.find_dialog_mut(&call_id)?.add_transaction(transaction)?;
            return Ok(());
        }

        match self.dialogs.entry(call_id) {
            Entry::Occupied(entry) => Err(UaError::DialogAlreadyExists(entry.key().clone())),
            Entry::Vacant(slot) => {
                let server = transaction.is_server();
                let via_transport = self.kind.via_transport();
                let dialog = Dialog::new(transaction, self.ids.clone(), via_transport)?;
                slot.insert(dialog);
                metrics().on_dialog_created(server);
                Ok(())
            }
        }
    }

    /// Applies a response to its dialog, evicting the dialog on termination.
    fn apply_response(&mut self, response: &Response) -> Result<Option<DialogState>, UaError> {
        let call_id = response.call_id();
        let state = self
            .find_dialog_mut(call_id)?
            .update_on_response(response.clone())?
            .state();
        if state == Some(DialogState::Terminated) {
            self.dialogs.remove(call_id);
            metrics().on_dialog_terminated(self.dialogs.len());
            debug!(call_id, "dialog terminated");
        }
        Ok(state)
    }
}

fn server_tag(ids: &dyn IdGenerator) -> SmolStr {
    SmolStr::new(format!("server-{}", ids.next_id()))
}
