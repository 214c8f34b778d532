use sip_core::{Request, Response};
use sip_ua::{UaError, UserAgentCore, UserAgentHandle, UserAgentHandler};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::Transcript;

type Core = UserAgentCore<Transcript>;

/// Answers every INVITE with 100 Trying, then 200 OK after a delay.
pub struct Answerer {
    handle: UserAgentHandle<Transcript, Answerer>,
    answer_delay: Duration,
}

impl Answerer {
    pub fn new(handle: UserAgentHandle<Transcript, Answerer>, answer_delay: Duration) -> Self {
        Self {
            handle,
            answer_delay,
        }
    }
}

impl UserAgentHandler<Transcript> for Answerer {
    fn on_listening_started(&mut self, ua: &mut Core) -> Result<(), UaError> {
        info!(bind = %ua.config().host_port(), "waiting for calls");
        Ok(())
    }

    fn on_invite(&mut self, ua: &mut Core, invite: &Request) -> Result<(), UaError> {
        let call_id = invite.call_id().to_owned();
        info!(%call_id, from = %invite.from(), "incoming call");
        let trying = ua.create_trying(&call_id)?;
        ua.send_response(trying, self)?;
        ua.set_application_data(&call_id, Transcript::new())?;

        let handle = self.handle.clone();
        let delay = self.answer_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let answered = handle
                .run(move |ua, answerer| {
                    let ok = ua.create_ok(&call_id)?;
                    ua.send_response(ok, answerer)
                })
                .await;
            match answered {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(%e, "could not answer call"),
                Err(e) => warn!(%e, "user agent gone before answering"),
            }
        });
        Ok(())
    }

    fn on_server_dialog_confirmed(&mut self, _ua: &mut Core, ack: &Request) -> Result<(), UaError> {
        info!(call_id = ack.call_id(), "call established");
        Ok(())
    }

    fn on_message(&mut self, ua: &mut Core, message: &Request) -> Result<(), UaError> {
        let text = String::from_utf8_lossy(message.body()).into_owned();
        info!(call_id = message.call_id(), %text, "message");
        if let Ok(Some(transcript)) = ua.application_data_mut(message.call_id()) {
            transcript.push(text);
        }
        Ok(())
    }

    fn on_bye(&mut self, ua: &mut Core, bye: &Request) -> Result<(), UaError> {
        if let Some(transcript) = ua.application_data(bye.call_id())? {
            info!(call_id = bye.call_id(), ?transcript, "caller hung up");
        }
        let ok = ua.create_ok(bye.call_id())?;
        ua.send_response(ok, self)
    }

    fn on_dialog_terminated(&mut self, _ua: &mut Core, response: &Response) -> Result<(), UaError> {
        info!(call_id = response.call_id(), "call terminated");
        Ok(())
    }
}
