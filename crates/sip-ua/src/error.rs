use sip_core::{MessageError, Method};
use sip_dialog::DialogError;
use sip_parse::ParseError;
use sip_transaction::TransactionError;
use sip_transport::TransportError;
use smol_str::SmolStr;
use thiserror::Error;

/// Failures surfaced by [`UserAgentCore`](crate::UserAgentCore) operations.
///
/// Every error is local to the call that returned it; dialogs are only
/// mutated after validation passes.
#[derive(Debug, Error)]
pub enum UaError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] ParseError),
    #[error("dialog not found, probably terminated; call-id = {0}")]
    DialogNotFound(SmolStr),
    #[error("dialog already exists for call-id {0}")]
    DialogAlreadyExists(SmolStr),
    #[error("unexpected request method {0}")]
    UnsupportedMethod(Method),
    #[error("success response with SDP must answer an INVITE, last request was {0}")]
    SdpRequiresInvite(Method),
    #[error("{0} transport not implemented yet")]
    TransportNotImplemented(SmolStr),
    #[error("unknown transport {0:?}")]
    UnknownTransport(SmolStr),
    #[error("user agent worker has stopped")]
    WorkerStopped,
    #[error(transparent)]
    Dialog(#[from] DialogError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
