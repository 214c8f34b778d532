// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use smol_str::SmolStr;

use crate::params::{parse_params, write_params, Params};

/// Characters escaped in the user part when a URI is rendered.
const USER_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'@')
    .add(b':')
    .add(b';')
    .add(b'?');

/// Parsed representation of a SIP URI (RFC 3261 §19).
///
/// URI headers (`?name=value`) are not modelled; the user agent never
/// places them in the addresses it builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    pub sips: bool,
    pub user: Option<SmolStr>,
    pub host: SmolStr,
    pub port: Option<u16>,
    pub params: Params,
}

impl SipUri {
    /// Constructs a `sip:` URI with the given host.
    pub fn new(host: impl Into<SmolStr>) -> Self {
        Self {
            sips: false,
            user: None,
            host: host.into(),
            port: None,
            params: Params::new(),
        }
    }

    /// Sets the user part.
    pub fn with_user(mut self, user: impl Into<SmolStr>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Attempts to parse a SIP or SIPS URI from the provided string.
    pub fn parse(input: &str) -> Option<Self> {
        let (scheme, rest) = input.trim().split_once(':')?;
        let sips = scheme.eq_ignore_ascii_case("sips");
        if !sips && !scheme.eq_ignore_ascii_case("sip") {
            return None;
        }

        // URI headers are dropped.
        let addr_part = rest.split('?').next()?;
        let mut parts = addr_part.split(';');
        let base = parts.next()?.trim();
        let params = parse_params(parts);

        let (user, host_port) = match base.rsplit_once('@') {
            Some((user, host)) => (
                Some(SmolStr::new(
                    percent_decode_str(user.trim()).decode_utf8().ok()?,
                )),
                host.trim(),
            ),
            None => (None, base),
        };

        if host_port.is_empty() {
            return None;
        }

        let (host, port) = split_host_port(host_port)?;
        if host.is_empty() {
            return None;
        }

        Some(Self {
            sips,
            user,
            host: SmolStr::new(host),
            port,
            params,
        })
    }

    /// Port to contact when none is given explicitly.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(if self.sips { 5061 } else { 5060 })
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.sips { "sips:" } else { "sip:" })?;
        if let Some(user) = &self.user {
            write!(f, "{}@", utf8_percent_encode(user, USER_ESCAPE))?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write_params(f, &self.params)
    }
}

/// Splits a host[:port] or IPv6 literal "[host]:port" string.
fn split_host_port(input: &str) -> Option<(&str, Option<u16>)> {
    if let Some(stripped) = input.strip_prefix('[') {
        let end = stripped.find(']')?;
        let host = &stripped[..end];
        match stripped[end + 1..].strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None => Some((host, None)),
        }
    } else if let Some((host, port)) = input.split_once(':') {
        if port.contains(':') {
            return None;
        }
        Some((host, Some(port.parse().ok()?)))
    } else {
        Some((input, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_host_port() {
        let uri = SipUri::parse("sip:alice@127.0.0.1:5080").unwrap();
        assert!(!uri.sips);
        assert_eq!(uri.user.as_deref(), Some("alice"));
        assert_eq!(uri.host.as_str(), "127.0.0.1");
        assert_eq!(uri.port, Some(5080));
        assert_eq!(uri.to_string(), "sip:alice@127.0.0.1:5080");
    }

    #[test]
    fn parses_params_and_ignores_headers() {
        let uri = SipUri::parse("sips:bob@example.com;transport=tcp;lr?subject=x").unwrap();
        assert!(uri.sips);
        assert_eq!(
            uri.params.get("transport"),
            Some(&Some(SmolStr::new("tcp")))
        );
        assert_eq!(uri.params.get("lr"), Some(&None));
        assert_eq!(uri.to_string(), "sips:bob@example.com;lr;transport=tcp");
    }

    #[test]
    fn escaped_user_survives_display() {
        let uri = SipUri::parse("sip:a%20b@example.com").unwrap();
        assert_eq!(uri.user.as_deref(), Some("a b"));
        assert_eq!(SipUri::parse(&uri.to_string()), Some(uri));
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let uri = SipUri::parse("sip:[2001:db8::1]:5070").unwrap();
        assert_eq!(uri.host.as_str(), "2001:db8::1");
        assert_eq!(uri.port, Some(5070));
        assert_eq!(uri.to_string(), "sip:[2001:db8::1]:5070");
    }

    #[test]
    fn rejects_unbracketed_ipv6_host() {
        assert!(SipUri::parse("sip:2001:db8::1").is_none());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(SipUri::parse("tel:+15551234567").is_none());
        assert!(SipUri::parse("sip:").is_none());
    }

    #[test]
    fn default_port_depends_on_scheme() {
        assert_eq!(SipUri::new("example.com").port_or_default(), 5060);
        assert_eq!(SipUri::parse("sips:example.com").unwrap().port_or_default(), 5061);
    }
}
