use std::fmt;

use smol_str::SmolStr;

use crate::params::{parse_params, write_params, Params};
use crate::SipUri;

/// SIP name-addr (`"Display" <uri>;params`) used by From, To and Contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    pub display_name: Option<SmolStr>,
    pub uri: SipUri,
    pub params: Params,
}

impl NameAddr {
    pub fn new(uri: SipUri) -> Self {
        Self {
            display_name: None,
            uri,
            params: Params::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn uri(&self) -> &SipUri {
        &self.uri
    }

    /// Parses a name-addr or bare addr-spec header value.
    ///
    /// Without angle brackets every `;param` belongs to the header, not the URI.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (display_name, rest) = split_display_name(input)?;

        if let Some(after_lt) = rest.strip_prefix('<') {
            let end = after_lt.find('>')?;
            let uri = SipUri::parse(&after_lt[..end])?;
            let tail = &after_lt[end + 1..];
            let params = parse_params(tail.split(';').skip(1));
            Some(Self {
                display_name,
                uri,
                params,
            })
        } else {
            if display_name.is_some() {
                return None;
            }
            let mut parts = rest.split(';');
            let uri = SipUri::parse(parts.next()?)?;
            Some(Self {
                display_name: None,
                uri,
                params: parse_params(parts),
            })
        }
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            f.write_str("\"")?;
            for c in name.chars() {
                if c == '"' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("\" ")?;
        }
        write!(f, "<{}>", self.uri)?;
        write_params(f, &self.params)
    }
}

/// Returns the optional display name and the remainder starting at the address.
fn split_display_name(input: &str) -> Option<(Option<SmolStr>, &str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut name = String::new();
        let mut escaped = false;
        for (idx, c) in quoted.char_indices() {
            match (escaped, c) {
                (true, _) => {
                    name.push(c);
                    escaped = false;
                }
                (false, '\\') => escaped = true,
                (false, '"') => {
                    let rest = quoted[idx + 1..].trim_start();
                    return Some((Some(SmolStr::new(name)), rest));
                }
                (false, _) => name.push(c),
            }
        }
        None
    } else if let Some(lt) = input.find('<') {
        let name = input[..lt].trim();
        let name = (!name.is_empty()).then(|| SmolStr::new(name));
        Some((name, &input[lt..]))
    } else {
        Some((None, input))
    }
}

/// From or To header: an address plus the optional dialog tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyHeader {
    pub addr: NameAddr,
    pub tag: Option<SmolStr>,
}

impl PartyHeader {
    pub fn new(addr: NameAddr, tag: Option<SmolStr>) -> Self {
        Self { addr, tag }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns a copy carrying `tag`, replacing any existing one.
    pub fn with_tag(&self, tag: impl Into<SmolStr>) -> Self {
        Self {
            addr: self.addr.clone(),
            tag: Some(tag.into()),
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let mut addr = NameAddr::parse(input)?;
        let tag = addr.params.remove("tag").flatten();
        Some(Self { addr, tag })
    }
}

impl fmt::Display for PartyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)?;
        if let Some(tag) = &self.tag {
            write!(f, ";tag={}", tag)?;
        }
        Ok(())
    }
}
