use sip_core::{Request, Response, SipUri};
use sip_ua::{UaError, UserAgentCore, UserAgentHandle, UserAgentHandler};
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::Transcript;

type Core = UserAgentCore<Transcript>;

/// Places one call, hangs up after `hangup_after` and signals `done` once
/// the dialog is terminated by either side.
pub struct Caller {
    handle: UserAgentHandle<Transcript, Caller>,
    user: String,
    target: SipUri,
    hangup_after: Duration,
    done: Option<oneshot::Sender<()>>,
}

impl Caller {
    pub fn new(
        handle: UserAgentHandle<Transcript, Caller>,
        user: String,
        target: SipUri,
        hangup_after: Duration,
        done: oneshot::Sender<()>,
    ) -> Self {
        Self {
            handle,
            user,
            target,
            hangup_after,
            done: Some(done),
        }
    }

    fn schedule_hangup(&self, call_id: String) {
        let handle = self.handle.clone();
        let delay = self.hangup_after;
        tokio::spawn(async move {
            sleep(delay).await;
            let hung_up = handle
                .run(move |ua, _| {
                    // the peer may have hung up first
                    if ua.dialog(&call_id).is_none() {
                        return Ok(());
                    }
                    let bye = ua.create_bye(&call_id)?;
                    ua.send_request(bye)
                })
                .await;
            match hung_up {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(%e, "could not hang up"),
                Err(e) => warn!(%e, "user agent gone before hangup"),
            }
        });
    }
}

impl UserAgentHandler<Transcript> for Caller {
    fn on_listening_started(&mut self, ua: &mut Core) -> Result<(), UaError> {
        info!(peer = %self.target, user = %self.user, "calling");
        let invite = ua.create_invite(&self.user, self.target.clone())?;
        ua.send_request(invite)
    }

    fn on_provisional_response(
        &mut self,
        _ua: &mut Core,
        response: &Response,
    ) -> Result<(), UaError> {
        info!(code = response.code(), reason = response.reason(), "call progress");
        Ok(())
    }

    fn on_client_dialog_confirmed(
        &mut self,
        ua: &mut Core,
        response: &Response,
    ) -> Result<(), UaError> {
        let call_id = response.call_id().to_owned();
        info!(%call_id, "call answered");
        let ack = ua.create_ack(&call_id)?;
        ua.send_request(ack)?;
        self.schedule_hangup(call_id);
        Ok(())
    }

    fn on_message(&mut self, _ua: &mut Core, message: &Request) -> Result<(), UaError> {
        let text = String::from_utf8_lossy(message.body());
        info!(call_id = message.call_id(), %text, "message");
        Ok(())
    }

    fn on_bye(&mut self, ua: &mut Core, bye: &Request) -> Result<(), UaError> {
        info!(call_id = bye.call_id(), "peer hung up");
        let ok = ua.create_ok(bye.call_id())?;
        ua.send_response(ok, self)
    }

    fn on_dialog_terminated(&mut self, _ua: &mut Core, response: &Response) -> Result<(), UaError> {
        info!(call_id = response.call_id(), "call terminated");
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        Ok(())
    }
}
