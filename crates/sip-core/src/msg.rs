// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytes::Bytes;
use smol_str::SmolStr;
use thiserror::Error;

use crate::{CSeq, Headers, Method, NameAddr, PartyHeader, SipUri, ViaHeader};

/// Max-Forwards value placed on every request the user agent builds.
pub const DEFAULT_MAX_FORWARDS: u8 = 70;

const MAX_REASON_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("invalid SIP status code: {code} (must be 100-699)")]
    InvalidStatusCode { code: u16 },
    #[error("invalid reason phrase: {0}")]
    InvalidReason(String),
    #[error("invalid CSeq sequence number: {seq}")]
    InvalidCSeq { seq: u32 },
    #[error("request must carry at least one Via header")]
    MissingVia,
    #[error("CSeq method {cseq} does not match request method {method}")]
    CSeqMethodMismatch { cseq: Method, method: Method },
    #[error("invalid Call-ID: {0:?}")]
    InvalidCallId(SmolStr),
    #[error("{0} has a typed field and cannot be added as an extra header")]
    ReservedHeader(SmolStr),
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(SmolStr),
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(SmolStr),
}

/// First line of a SIP response.
///
/// # Examples
///
/// ```
/// use sip_core::StatusLine;
///
/// let status = StatusLine::new(200, "OK").unwrap();
/// assert_eq!(status.code(), 200);
/// assert!(StatusLine::new(99, "Invalid").is_err());
/// assert!(StatusLine::new(200, "OK\r\nInjected").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    code: u16,
    reason: SmolStr,
}

impl StatusLine {
    /// Creates a status line after validating the code range and the phrase.
    /// Surrounding whitespace is dropped from the phrase.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside 100-699 or the reason phrase
    /// contains control characters or is longer than 256 bytes.
    pub fn new(code: u16, reason: impl AsRef<str>) -> Result<Self, MessageError> {
        if !(100..=699).contains(&code) {
            return Err(MessageError::InvalidStatusCode { code });
        }
        let reason = reason.as_ref().trim();
        validate_reason_phrase(reason)?;
        Ok(Self {
            code,
            reason: SmolStr::new(reason),
        })
    }

    /// Status line with the default RFC 3261 reason phrase for `code`.
    pub fn with_default_reason(code: u16) -> Result<Self, MessageError> {
        Self::new(code, reason_phrase(code))
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.code)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

fn validate_reason_phrase(reason: &str) -> Result<(), MessageError> {
    if reason.len() > MAX_REASON_LENGTH {
        return Err(MessageError::InvalidReason(format!(
            "too long (max {}, got {})",
            MAX_REASON_LENGTH,
            reason.len()
        )));
    }
    if reason.chars().any(|c| c.is_control()) {
        return Err(MessageError::InvalidReason(
            "contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// A Call-ID is a single non-empty word: no whitespace, no control characters.
fn validate_call_id(call_id: &str) -> Result<(), MessageError> {
    if call_id.is_empty() || call_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(MessageError::InvalidCallId(SmolStr::new(call_id)));
    }
    Ok(())
}

/// Default reason phrase for a status code (RFC 3261 §21).
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Trying",
        180 => "Ringing",
        181 => "Call Is Being Forwarded",
        182 => "Queued",
        183 => "Session Progress",
        200 => "OK",
        202 => "Accepted",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Moved Temporarily",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        480 => "Temporarily Unavailable",
        481 => "Call/Transaction Does Not Exist",
        486 => "Busy Here",
        487 => "Request Terminated",
        488 => "Not Acceptable Here",
        500 => "Server Internal Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        600 => "Busy Everywhere",
        603 => "Decline",
        _ => match code / 100 {
            1 => "Provisional",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            5 => "Server Error",
            _ => "Global Failure",
        },
    }
}

/// Typed header fields shared by requests and responses.
///
/// The Via list is ordered; the first element is the topmost Via.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeaders {
    pub via: Vec<ViaHeader>,
    pub max_forwards: u8,
    pub from: PartyHeader,
    pub to: PartyHeader,
    pub call_id: SmolStr,
    pub cseq: CSeq,
    pub contact: Option<NameAddr>,
    pub content_type: Option<SmolStr>,
    /// Any header without a typed field above.
    pub extra: Headers,
}

impl MessageHeaders {
    pub fn new(
        via: Vec<ViaHeader>,
        from: PartyHeader,
        to: PartyHeader,
        call_id: impl Into<SmolStr>,
        cseq: CSeq,
    ) -> Self {
        Self {
            via,
            max_forwards: DEFAULT_MAX_FORWARDS,
            from,
            to,
            call_id: call_id.into(),
            cseq,
            contact: None,
            content_type: None,
            extra: Headers::new(),
        }
    }

    pub fn top_via(&self) -> Option<&ViaHeader> {
        self.via.first()
    }
}

/// SIP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: SipUri,
    headers: MessageHeaders,
    body: Bytes,
}

impl Request {
    /// Creates a request without a body.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::MissingVia`] when `headers.via` is empty,
    /// [`MessageError::CSeqMethodMismatch`] when the CSeq names another
    /// method and [`MessageError::InvalidCallId`] for an empty or
    /// multi-word Call-ID.
    pub fn new(method: Method, uri: SipUri, headers: MessageHeaders) -> Result<Self, MessageError> {
        if headers.via.is_empty() {
            return Err(MessageError::MissingVia);
        }
        if *headers.cseq.method() != method {
            return Err(MessageError::CSeqMethodMismatch {
                cseq: headers.cseq.method().clone(),
                method,
            });
        }
        validate_call_id(&headers.call_id)?;
        Ok(Self {
            method,
            uri,
            headers,
            body: Bytes::new(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &SipUri {
        &self.uri
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn call_id(&self) -> &str {
        &self.headers.call_id
    }

    pub fn cseq(&self) -> &CSeq {
        &self.headers.cseq
    }

    pub fn from(&self) -> &PartyHeader {
        &self.headers.from
    }

    pub fn to(&self) -> &PartyHeader {
        &self.headers.to
    }

    /// The topmost Via; always present on a constructed request.
    pub fn top_via(&self) -> &ViaHeader {
        &self.headers.via[0]
    }

    pub fn contact(&self) -> Option<&NameAddr> {
        self.headers.contact.as_ref()
    }

    pub fn set_contact(&mut self, contact: NameAddr) {
        self.headers.contact = Some(contact);
    }

    pub fn extra_headers_mut(&mut self) -> &mut Headers {
        &mut self.headers.extra
    }

    /// Replaces the body together with its Content-Type.
    pub fn set_body(&mut self, content_type: impl Into<SmolStr>, body: impl Into<Bytes>) {
        self.headers.content_type = Some(content_type.into());
        self.body = body.into();
    }

    /// Attaches a body, leaving Content-Type as it is.
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Builds a response copying Via, From, To, Call-ID and CSeq from this
    /// request (RFC 3261 §8.2.6.2).
    pub fn create_response(&self, code: u16) -> Result<Response, MessageError> {
        let status = StatusLine::with_default_reason(code)?;
        let headers = MessageHeaders::new(
            self.headers.via.clone(),
            self.headers.from.clone(),
            self.headers.to.clone(),
            self.headers.call_id.clone(),
            self.headers.cseq.clone(),
        );
        Response::new(status, headers)
    }
}

/// SIP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusLine,
    headers: MessageHeaders,
    body: Bytes,
}

impl Response {
    /// Creates a response without a body.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidCallId`] for an empty or multi-word Call-ID.
    pub fn new(status: StatusLine, headers: MessageHeaders) -> Result<Self, MessageError> {
        validate_call_id(&headers.call_id)?;
        Ok(Self {
            status,
            headers,
            body: Bytes::new(),
        })
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn code(&self) -> u16 {
        self.status.code()
    }

    pub fn reason(&self) -> &str {
        self.status.reason()
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn call_id(&self) -> &str {
        &self.headers.call_id
    }

    pub fn cseq(&self) -> &CSeq {
        &self.headers.cseq
    }

    pub fn from(&self) -> &PartyHeader {
        &self.headers.from
    }

    pub fn to(&self) -> &PartyHeader {
        &self.headers.to
    }

    pub fn top_via(&self) -> Option<&ViaHeader> {
        self.headers.top_via()
    }

    pub fn contact(&self) -> Option<&NameAddr> {
        self.headers.contact.as_ref()
    }

    pub fn set_to_tag(&mut self, tag: impl Into<SmolStr>) {
        self.headers.to.tag = Some(tag.into());
    }

    pub fn set_contact(&mut self, contact: NameAddr) {
        self.headers.contact = Some(contact);
    }

    pub fn set_body(&mut self, content_type: impl Into<SmolStr>, body: impl Into<Bytes>) {
        self.headers.content_type = Some(content_type.into());
        self.body = body.into();
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }
}

/// A decoded SIP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipMessage {
    Request(Request),
    Response(Response),
}

impl SipMessage {
    pub fn headers(&self) -> &MessageHeaders {
        match self {
            SipMessage::Request(req) => req.headers(),
            SipMessage::Response(resp) => resp.headers(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.headers().call_id
    }

    pub fn body(&self) -> &Bytes {
        match self {
            SipMessage::Request(req) => req.body(),
            SipMessage::Response(resp) => resp.body(),
        }
    }

    /// Start line without the trailing CRLF, for log lines.
    pub fn summary(&self) -> String {
        match self {
            SipMessage::Request(req) => format!("{} {} SIP/2.0", req.method(), req.uri()),
            SipMessage::Response(resp) => format!("SIP/2.0 {} {}", resp.code(), resp.reason()),
        }
    }
}

impl From<Request> for SipMessage {
    fn from(req: Request) -> Self {
        SipMessage::Request(req)
    }
}

impl From<Response> for SipMessage {
    fn from(resp: Response) -> Self {
        SipMessage::Response(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> Request {
        let via = ViaHeader::new("UDP", "127.0.0.1", Some(5080), "z9hG4bK-1");
        let from = PartyHeader::parse("<sip:Client@127.0.0.1:5080>;tag=initiator-1").unwrap();
        let to = PartyHeader::parse("<sip:Server@127.0.0.2:5082>").unwrap();
        let headers = MessageHeaders::new(
            vec![via],
            from,
            to,
            "call-1",
            CSeq::new(1, Method::Invite).unwrap(),
        );
        Request::new(
            Method::Invite,
            SipUri::parse("sip:Server@127.0.0.2:5082").unwrap(),
            headers,
        )
        .unwrap()
    }

    #[test]
    fn status_code_range_is_enforced() {
        assert!(StatusLine::new(100, "Trying").is_ok());
        assert!(StatusLine::new(699, "Whatever").is_ok());
        assert_eq!(
            StatusLine::new(700, "Nope"),
            Err(MessageError::InvalidStatusCode { code: 700 })
        );
    }

    #[test]
    fn request_without_via_is_rejected() {
        let mut headers = invite().headers().clone();
        headers.via.clear();
        let result = Request::new(Method::Bye, SipUri::new("example.com"), headers);
        assert_eq!(result, Err(MessageError::MissingVia));
    }

    #[test]
    fn request_method_must_match_cseq() {
        let headers = invite().headers().clone();
        let result = Request::new(Method::Bye, SipUri::new("example.com"), headers);
        assert_eq!(
            result,
            Err(MessageError::CSeqMethodMismatch {
                cseq: Method::Invite,
                method: Method::Bye,
            })
        );
    }

    #[test]
    fn call_id_must_be_one_word() {
        for bad in ["", "two words", "line\r\nbreak"] {
            let mut headers = invite().headers().clone();
            headers.call_id = bad.into();
            let uri = SipUri::new("example.com");
            assert_eq!(
                Request::new(Method::Invite, uri, headers.clone()),
                Err(MessageError::InvalidCallId(bad.into()))
            );
            let status = StatusLine::new(200, "OK").unwrap();
            assert_eq!(
                Response::new(status, headers),
                Err(MessageError::InvalidCallId(bad.into()))
            );
        }
    }

    #[test]
    fn reason_phrase_is_trimmed() {
        let status = StatusLine::new(200, "  OK ").unwrap();
        assert_eq!(status.reason(), "OK");
    }

    #[test]
    fn response_copies_dialog_headers() {
        let req = invite();
        let resp = req.create_response(100).unwrap();
        assert_eq!(resp.code(), 100);
        assert_eq!(resp.reason(), "Trying");
        assert_eq!(resp.headers().via, req.headers().via);
        assert_eq!(resp.from(), req.from());
        assert_eq!(resp.to(), req.to());
        assert_eq!(resp.cseq(), req.cseq());
        assert_eq!(resp.call_id(), "call-1");
        assert!(resp.contact().is_none());
    }

    #[test]
    fn summary_is_first_line() {
        let req = invite();
        assert_eq!(
            SipMessage::from(req).summary(),
            "INVITE sip:Server@127.0.0.2:5082 SIP/2.0"
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_class_phrase() {
        assert_eq!(reason_phrase(299), "Success");
        assert_eq!(reason_phrase(486), "Busy Here");
    }
}
