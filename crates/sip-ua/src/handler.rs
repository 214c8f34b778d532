use sip_core::{Request, Response};

use crate::{UaError, UserAgentCore};

/// Application hooks invoked by the user-agent core.
///
/// Every hook is optional. Hooks receive the core so they can build and send
/// follow-up messages; pass `self` back as the handler when a send needs one:
///
/// ```
/// use sip_core::Request;
/// use sip_ua::{UaError, UserAgentCore, UserAgentHandler};
///
/// struct AnswerBye;
///
/// impl UserAgentHandler<()> for AnswerBye {
///     fn on_bye(&mut self, ua: &mut UserAgentCore<()>, bye: &Request) -> Result<(), UaError> {
///         let ok = ua.create_ok(bye.call_id())?;
///         ua.send_response(ok, self)
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait UserAgentHandler<T> {
    /// The transport is bound and packets are being delivered.
    fn on_listening_started(&mut self, ua: &mut UserAgentCore<T>) -> Result<(), UaError> {
        Ok(())
    }

    /// A new INVITE created a server dialog.
    fn on_invite(&mut self, ua: &mut UserAgentCore<T>, invite: &Request) -> Result<(), UaError> {
        Ok(())
    }

    fn on_bye(&mut self, ua: &mut UserAgentCore<T>, bye: &Request) -> Result<(), UaError> {
        Ok(())
    }

    /// MESSAGE requests bypass transactions and dialog state.
    fn on_message(&mut self, ua: &mut UserAgentCore<T>, message: &Request) -> Result<(), UaError> {
        Ok(())
    }

    fn on_provisional_response(
        &mut self,
        ua: &mut UserAgentCore<T>,
        response: &Response,
    ) -> Result<(), UaError> {
        Ok(())
    }

    /// A 2xx to our INVITE arrived; the usual reaction is to send the ACK.
    fn on_client_dialog_confirmed(
        &mut self,
        ua: &mut UserAgentCore<T>,
        response: &Response,
    ) -> Result<(), UaError> {
        Ok(())
    }

    /// The peer ACKed our 2xx.
    fn on_server_dialog_confirmed(
        &mut self,
        ua: &mut UserAgentCore<T>,
        ack: &Request,
    ) -> Result<(), UaError> {
        Ok(())
    }

    /// A 2xx to a BYE was sent or received. The dialog is already evicted.
    fn on_dialog_terminated(
        &mut self,
        ua: &mut UserAgentCore<T>,
        response: &Response,
    ) -> Result<(), UaError> {
        Ok(())
    }
}

impl<T> UserAgentHandler<T> for () {}
