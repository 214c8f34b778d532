#![allow(dead_code)]

use std::sync::Arc;

use sip_core::{Request, Response};
use sip_parse::SipCodec;
use sip_testkit::{RecordingTransport, SequentialIdGenerator};
use sip_ua::{UaError, UserAgentConfig, UserAgentCore, UserAgentHandler};

pub type Core = UserAgentCore<Vec<String>>;

/// Handler that records every hook and, when `auto_answer` is set, plays
/// both ends of a basic call.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<String>,
    pub auto_answer: bool,
}

impl Recorder {
    pub fn answering() -> Self {
        Self {
            events: Vec::new(),
            auto_answer: true,
        }
    }
}

impl UserAgentHandler<Vec<String>> for Recorder {
    fn on_listening_started(&mut self, _ua: &mut Core) -> Result<(), UaError> {
        self.events.push("listening".to_owned());
        Ok(())
    }

    fn on_invite(&mut self, ua: &mut Core, invite: &Request) -> Result<(), UaError> {
        self.events.push(format!("invite {}", invite.call_id()));
        if self.auto_answer {
            let trying = ua.create_trying(invite.call_id())?;
            ua.send_response(trying, self)?;
            let ok = ua.create_ok(invite.call_id())?;
            ua.send_response(ok, self)?;
        }
        Ok(())
    }

    fn on_bye(&mut self, ua: &mut Core, bye: &Request) -> Result<(), UaError> {
        self.events.push("bye".to_owned());
        if self.auto_answer {
            let ok = ua.create_ok(bye.call_id())?;
            ua.send_response(ok, self)?;
        }
        Ok(())
    }

    fn on_message(&mut self, _ua: &mut Core, message: &Request) -> Result<(), UaError> {
        let text = String::from_utf8_lossy(message.body()).into_owned();
        self.events.push(format!("message {}", text));
        Ok(())
    }

    fn on_provisional_response(
        &mut self,
        _ua: &mut Core,
        response: &Response,
    ) -> Result<(), UaError> {
        self.events.push(format!("provisional {}", response.code()));
        Ok(())
    }

    fn on_client_dialog_confirmed(
        &mut self,
        ua: &mut Core,
        response: &Response,
    ) -> Result<(), UaError> {
        self.events.push("client-confirmed".to_owned());
        if self.auto_answer {
            let ack = ua.create_ack(response.call_id())?;
            ua.send_request(ack)?;
        }
        Ok(())
    }

    fn on_server_dialog_confirmed(
        &mut self,
        _ua: &mut Core,
        _ack: &Request,
    ) -> Result<(), UaError> {
        self.events.push("server-confirmed".to_owned());
        Ok(())
    }

    fn on_dialog_terminated(
        &mut self,
        _ua: &mut Core,
        _response: &Response,
    ) -> Result<(), UaError> {
        self.events.push("terminated".to_owned());
        Ok(())
    }
}

/// Core bound to `127.0.0.1:port` with a recording transport.
pub fn core(port: u16, id_prefix: &str) -> (Core, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let config = UserAgentConfig::new("127.0.0.1", port, "udp").unwrap();
    let core = UserAgentCore::with_parts(
        config,
        Arc::new(SipCodec::default()),
        transport.clone(),
        Arc::new(SequentialIdGenerator::new(id_prefix)),
    )
    .unwrap();
    (core, transport)
}

/// Feeds everything `from` has sent into `to`.
pub fn deliver(from: &RecordingTransport, to: &mut Core, handler: &mut Recorder) {
    for sent in from.take() {
        to.on_incoming_bytes(&sent.payload, handler).unwrap();
    }
}
