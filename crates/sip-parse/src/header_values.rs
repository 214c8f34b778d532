//! Mapping of raw header lines onto the typed header block.

use sip_core::{
    CSeq, Headers, MessageHeaders, NameAddr, PartyHeader, ViaHeader, DEFAULT_MAX_FORWARDS,
};
use smol_str::SmolStr;

use crate::ParseError;

/// Expands compact header names (RFC 3261 §7.3.3); other names are kept as written.
pub fn canonical_header_name(name: &str) -> SmolStr {
    let canonical = match name.to_ascii_lowercase().as_str() {
        "i" => "Call-ID",
        "f" => "From",
        "t" => "To",
        "m" => "Contact",
        "l" => "Content-Length",
        "c" => "Content-Type",
        "v" => "Via",
        "s" => "Subject",
        "k" => "Supported",
        "e" => "Content-Encoding",
        _ => name,
    };
    SmolStr::new(canonical)
}

/// Builds [`MessageHeaders`] from `(name, value)` pairs in wire order.
///
/// Repeated singleton headers keep their first occurrence. Via values may
/// be split across lines or comma-separated within one line.
pub fn typed_headers(raw: Vec<(SmolStr, String)>) -> Result<MessageHeaders, ParseError> {
    let mut via = Vec::new();
    let mut max_forwards = None;
    let mut from = None;
    let mut to = None;
    let mut call_id = None;
    let mut cseq = None;
    let mut contact = None;
    let mut content_type = None;
    let mut extra = Headers::new();

    for (name, value) in raw {
        match name.to_ascii_lowercase().as_str() {
            "via" => {
                for part in value.split(',') {
                    via.push(ViaHeader::parse(part).ok_or_else(|| invalid("Via", part))?);
                }
            }
            "max-forwards" if max_forwards.is_none() => {
                max_forwards = Some(
                    value
                        .trim()
                        .parse::<u8>()
                        .map_err(|_| invalid("Max-Forwards", &value))?,
                );
            }
            "from" if from.is_none() => {
                from = Some(PartyHeader::parse(&value).ok_or_else(|| invalid("From", &value))?);
            }
            "to" if to.is_none() => {
                to = Some(PartyHeader::parse(&value).ok_or_else(|| invalid("To", &value))?);
            }
            "call-id" if call_id.is_none() => {
                if value.is_empty() {
                    return Err(invalid("Call-ID", &value));
                }
                call_id = Some(SmolStr::new(value));
            }
            "cseq" if cseq.is_none() => {
                cseq = Some(CSeq::parse(&value).ok_or_else(|| invalid("CSeq", &value))?);
            }
            "contact" if contact.is_none() => {
                contact = Some(NameAddr::parse(&value).ok_or_else(|| invalid("Contact", &value))?);
            }
            "content-type" if content_type.is_none() => {
                content_type = Some(SmolStr::new(value));
            }
            "max-forwards" | "from" | "to" | "call-id" | "cseq" | "contact" | "content-type"
            | "content-length" => {}
            _ => extra.push(name, value)?,
        }
    }

    let mut headers = MessageHeaders::new(
        via,
        from.ok_or(ParseError::MissingHeader("From"))?,
        to.ok_or(ParseError::MissingHeader("To"))?,
        call_id.ok_or(ParseError::MissingHeader("Call-ID"))?,
        cseq.ok_or(ParseError::MissingHeader("CSeq"))?,
    );
    headers.max_forwards = max_forwards.unwrap_or(DEFAULT_MAX_FORWARDS);
    headers.contact = contact;
    headers.content_type = content_type;
    headers.extra = extra;
    Ok(headers)
}

fn invalid(name: &'static str, value: &str) -> ParseError {
    ParseError::InvalidHeader {
        name,
        value: value.to_string(),
    }
}
