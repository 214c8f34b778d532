//! Text codec for SIP messages.
//!
//! [`SipCodec`] turns datagrams into typed [`SipMessage`] values and back.
//! Encoding always writes the typed headers in a fixed order followed by
//! extension headers and a recomputed `Content-Length`, so that
//! `decode(encode(m)) == m` for every message built through `sip-core`.

use std::fmt::Write;

use bytes::{Bytes, BytesMut};
use sip_core::{MessageError, Method, Request, Response, SipMessage, SipUri, StatusLine};
use smol_str::SmolStr;
use thiserror::Error;

mod header_values;

pub use header_values::{canonical_header_name, typed_headers};

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("message too large (max {max}, got {actual})")]
    TooLarge { max: usize, actual: usize },
    #[error("message head is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed start line: {0}")]
    InvalidStartLine(String),
    #[error("missing mandatory header {0}")]
    MissingHeader(&'static str),
    #[error("invalid {name} header: {value}")]
    InvalidHeader { name: &'static str, value: String },
    #[error("header continuation without a header")]
    OrphanContinuation,
    #[error("body shorter than Content-Length (declared {declared}, got {actual})")]
    TruncatedBody { declared: usize, actual: usize },
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Converts between wire bytes and [`SipMessage`] values.
pub trait Codec: Send + Sync {
    fn decode(&self, datagram: &[u8]) -> Result<SipMessage, ParseError>;
    fn encode(&self, message: &SipMessage) -> Bytes;
}

/// RFC 3261 text codec.
#[derive(Debug, Clone)]
pub struct SipCodec {
    max_message_size: usize,
}

impl SipCodec {
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for SipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for SipCodec {
    fn decode(&self, datagram: &[u8]) -> Result<SipMessage, ParseError> {
        if datagram.len() > self.max_message_size {
            return Err(ParseError::TooLarge {
                max: self.max_message_size,
                actual: datagram.len(),
            });
        }
        decode_message(datagram)
    }

    fn encode(&self, message: &SipMessage) -> Bytes {
        match message {
            SipMessage::Request(req) => serialize_request(req),
            SipMessage::Response(resp) => serialize_response(resp),
        }
    }
}

/// Decodes a request or response without a size limit.
pub fn decode_message(datagram: &[u8]) -> Result<SipMessage, ParseError> {
    let (head, body_bytes) = split_head_body(datagram)?;
    let mut lines = head.split("\r\n");
    let first = lines.next().map(str::trim).unwrap_or_default();
    let raw = parse_headers(lines)?;
    let body = extract_body(body_bytes, &raw)?;
    let headers = typed_headers(raw)?;

    if first.starts_with("SIP/") {
        let status = parse_status_line(first)?;
        Ok(SipMessage::Response(
            Response::new(status, headers)?.with_body(body),
        ))
    } else {
        let (method, uri) = parse_request_line(first)?;
        if headers.via.is_empty() {
            return Err(ParseError::MissingHeader("Via"));
        }
        Ok(SipMessage::Request(
            Request::new(method, uri, headers)?.with_body(body),
        ))
    }
}

/// Serializes a SIP request with a recomputed `Content-Length`.
pub fn serialize_request(req: &Request) -> Bytes {
    let mut buf = String::new();
    let _ = write!(buf, "{} {} SIP/2.0\r\n", req.method(), req.uri());
    write_headers(&mut buf, req.headers(), req.body().len());
    finish(buf, req.body())
}

/// Serializes a SIP response with a recomputed `Content-Length`.
pub fn serialize_response(resp: &Response) -> Bytes {
    let mut buf = String::new();
    let _ = write!(buf, "SIP/2.0 {} {}\r\n", resp.code(), resp.reason());
    write_headers(&mut buf, resp.headers(), resp.body().len());
    finish(buf, resp.body())
}

fn write_headers(buf: &mut String, headers: &sip_core::MessageHeaders, body_len: usize) {
    for via in &headers.via {
        let _ = write!(buf, "Via: {}\r\n", via);
    }
    let _ = write!(buf, "Max-Forwards: {}\r\n", headers.max_forwards);
    let _ = write!(buf, "From: {}\r\n", headers.from);
    let _ = write!(buf, "To: {}\r\n", headers.to);
    let _ = write!(buf, "Call-ID: {}\r\n", headers.call_id);
    let _ = write!(buf, "CSeq: {}\r\n", headers.cseq);
    if let Some(contact) = &headers.contact {
        let _ = write!(buf, "Contact: {}\r\n", contact);
    }
    if let Some(content_type) = &headers.content_type {
        let _ = write!(buf, "Content-Type: {}\r\n", content_type);
    }
    for header in &headers.extra {
        let _ = write!(buf, "{}: {}\r\n", header.name, header.value.trim());
    }
    let _ = write!(buf, "Content-Length: {}\r\n\r\n", body_len);
}

fn finish(head: String, body: &Bytes) -> Bytes {
    let mut out = BytesMut::with_capacity(head.len() + body.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(body.as_ref());
    out.freeze()
}

/// Parses the request-line into a method and request URI.
fn parse_request_line(line: &str) -> Result<(Method, SipUri), ParseError> {
    use nom::{
        bytes::complete::{tag_no_case, take_while1},
        character::complete::space1,
        combinator::eof,
        sequence::tuple,
    };

    let mut parser = tuple((
        take_while1::<_, _, nom::error::Error<_>>(is_token_char),
        space1::<_, nom::error::Error<_>>,
        take_while1::<_, _, nom::error::Error<_>>(is_uri_char),
        space1::<_, nom::error::Error<_>>,
        tag_no_case::<_, _, nom::error::Error<_>>("SIP/2.0"),
        eof::<_, nom::error::Error<_>>,
    ));
    let (_, (method_token, _, uri_token, _, _, _)) = parser(line)
        .map_err(|_| ParseError::InvalidStartLine(line.to_string()))?;

    let uri = SipUri::parse(uri_token)
        .ok_or_else(|| ParseError::InvalidStartLine(line.to_string()))?;
    Ok((Method::from_token(method_token), uri))
}

/// Parses the status-line of a SIP response.
fn parse_status_line(line: &str) -> Result<StatusLine, ParseError> {
    use nom::{
        bytes::complete::tag_no_case,
        character::complete::{space0, space1, u16 as nom_u16},
        combinator::rest,
        sequence::tuple,
    };

    let mut parser = tuple((
        tag_no_case::<_, _, nom::error::Error<_>>("SIP/2.0"),
        space1::<_, nom::error::Error<_>>,
        nom_u16::<_, nom::error::Error<_>>,
        space0::<_, nom::error::Error<_>>,
        rest::<_, nom::error::Error<_>>,
    ));
    let (_, (_, _, code, _, reason)) =
        parser(line).map_err(|_| ParseError::InvalidStartLine(line.to_string()))?;

    Ok(StatusLine::new(code, reason.trim())?)
}

/// Splits raw bytes into header text and body slice using the `\r\n\r\n` separator.
fn split_head_body(datagram: &[u8]) -> Result<(&str, &[u8]), ParseError> {
    let delim = b"\r\n\r\n";
    let (head, body) = match datagram
        .windows(delim.len())
        .position(|window| window == delim)
    {
        Some(pos) => (&datagram[..pos], &datagram[pos + delim.len()..]),
        None => (datagram, &[][..]),
    };
    let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidUtf8)?;
    Ok((head, body))
}

/// Parses SIP header lines into name/value pairs, joining folded
/// continuation lines per RFC 3261 §7.3.1.
fn parse_headers<'a, I>(lines: I) -> Result<Vec<(SmolStr, String)>, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut headers: Vec<(SmolStr, String)> = Vec::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            let (_, current) = headers.last_mut().ok_or(ParseError::OrphanContinuation)?;
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(value);
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((canonical_header_name(name.trim()), value.trim().to_owned()));
            }
            None => {
                return Err(ParseError::InvalidHeader {
                    name: "header line",
                    value: line.to_string(),
                })
            }
        }
    }

    Ok(headers)
}

/// Returns the body truncated to the declared `Content-Length`.
fn extract_body(body_bytes: &[u8], headers: &[(SmolStr, String)]) -> Result<Bytes, ParseError> {
    let declared = match headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
    {
        Some((_, value)) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidHeader {
                name: "Content-Length",
                value: value.clone(),
            })?,
        None => body_bytes.len(),
    };
    if declared > body_bytes.len() {
        return Err(ParseError::TruncatedBody {
            declared,
            actual: body_bytes.len(),
        });
    }
    Ok(Bytes::copy_from_slice(&body_bytes[..declared]))
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

// Permissive URI character set: stop at whitespace.
fn is_uri_char(c: char) -> bool {
    !c.is_whitespace()
}
