use std::fmt;

use smol_str::SmolStr;

use crate::params::{parse_params, write_params, Params};

/// Branch prefix mandated by RFC 3261 §8.1.1.7.
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

/// Parsed representation of a single Via header value.
///
/// The sent-protocol is always `SIP/2.0`; only the transport token varies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaHeader {
    pub transport: SmolStr,
    pub host: SmolStr,
    pub port: Option<u16>,
    pub branch: SmolStr,
    /// Parameters other than `branch` (e.g. `rport`, `received`).
    pub params: Params,
}

impl ViaHeader {
    pub fn new(
        transport: impl Into<SmolStr>,
        host: impl Into<SmolStr>,
        port: Option<u16>,
        branch: impl Into<SmolStr>,
    ) -> Self {
        Self {
            transport: transport.into(),
            host: host.into(),
            port,
            branch: branch.into(),
            params: Params::new(),
        }
    }

    /// Returns the transport token (e.g. UDP/TCP) associated with this Via.
    pub fn transport(&self) -> &str {
        self.transport.as_str()
    }

    /// Copy of this Via carrying a different branch.
    pub fn with_branch(&self, branch: impl Into<SmolStr>) -> Self {
        Self {
            branch: branch.into(),
            ..self.clone()
        }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(5060)
    }

    /// Parses one Via value such as `SIP/2.0/UDP host:5060;branch=z9hG4bK1`.
    ///
    /// A Via without a branch parameter is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (protocol, rest) = input.split_once(char::is_whitespace)?;
        let mut proto_parts = protocol.split('/');
        let name = proto_parts.next()?;
        let version = proto_parts.next()?;
        let transport = proto_parts.next()?;
        if !name.eq_ignore_ascii_case("SIP") || version != "2.0" || proto_parts.next().is_some() {
            return None;
        }

        let mut parts = rest.split(';');
        let sent_by = parts.next()?.trim();
        let (host, port) = split_sent_by(sent_by)?;
        let mut params = parse_params(parts);
        let branch = params.remove("branch").flatten()?;

        Some(Self {
            transport: SmolStr::new(transport),
            host: SmolStr::new(host),
            port,
            branch,
            params,
        })
    }
}

impl fmt::Display for ViaHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} ", self.transport)?;
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, ";branch={}", self.branch)?;
        write_params(f, &self.params)
    }
}

fn split_sent_by(input: &str) -> Option<(&str, Option<u16>)> {
    let split = if let Some(stripped) = input.strip_prefix('[') {
        let (host, rest) = stripped.split_once(']')?;
        match rest.strip_prefix(':') {
            Some(port) => Some((host, Some(port.trim().parse().ok()?))),
            None => Some((host, None)),
        }
    } else {
        match input.split_once(':') {
            Some((host, port)) => Some((host, Some(port.trim().parse().ok()?))),
            None => Some((input, None)),
        }
    };
    split.filter(|(host, _)| !host.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_sent_by_and_branch() {
        let via =
            ViaHeader::parse("SIP/2.0/UDP 127.0.0.1:5080;branch=z9hG4bK-mockId;rport").unwrap();
        assert_eq!(via.transport(), "UDP");
        assert_eq!(via.host.as_str(), "127.0.0.1");
        assert_eq!(via.port, Some(5080));
        assert_eq!(via.branch.as_str(), "z9hG4bK-mockId");
        assert_eq!(via.params.get("rport"), Some(&None));
        assert_eq!(
            via.to_string(),
            "SIP/2.0/UDP 127.0.0.1:5080;branch=z9hG4bK-mockId;rport"
        );
    }

    #[test]
    fn missing_branch_is_rejected() {
        assert!(ViaHeader::parse("SIP/2.0/UDP host").is_none());
    }

    #[test]
    fn wrong_protocol_is_rejected() {
        assert!(ViaHeader::parse("SIP/3.0/UDP host;branch=x").is_none());
        assert!(ViaHeader::parse("HTTP/2.0/UDP host;branch=x").is_none());
    }

    #[test]
    fn with_branch_keeps_sent_by() {
        let via = ViaHeader::new("TCP", "10.0.0.1", None, "z9hG4bKa");
        let cloned = via.with_branch("z9hG4bKb");
        assert_eq!(cloned.host, via.host);
        assert_eq!(cloned.branch.as_str(), "z9hG4bKb");
        assert_eq!(cloned.port_or_default(), 5060);
    }
}
