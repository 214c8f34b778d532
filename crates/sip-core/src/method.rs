use std::fmt;

use smol_str::SmolStr;

/// SIP request methods known to the user agent.
///
/// Method tokens are case-sensitive (RFC 3261 §7.1), so `invite` is an
/// extension method and not [`Method::Invite`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Options,
    Message,
    Prack,
    Unknown(SmolStr),
}

impl Method {
    /// Returns the wire token for this method.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Options => "OPTIONS",
            Method::Message => "MESSAGE",
            Method::Prack => "PRACK",
            Method::Unknown(token) => token.as_str(),
        }
    }

    /// Parses a method token, returning Unknown for extension methods.
    pub fn from_token(token: &str) -> Self {
        match token {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "OPTIONS" => Method::Options,
            "MESSAGE" => Method::Message,
            "PRACK" => Method::Prack,
            other => Method::Unknown(SmolStr::new(other)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(token: &str) -> Self {
        Method::from_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_map_to_variants() {
        assert_eq!(Method::from_token("INVITE"), Method::Invite);
        assert_eq!(Method::from_token("MESSAGE"), Method::Message);
        assert_eq!(Method::Bye.as_str(), "BYE");
    }

    #[test]
    fn tokens_are_case_sensitive() {
        let method = Method::from_token("invite");
        assert_eq!(method, Method::Unknown(SmolStr::new("invite")));
        assert_eq!(method.as_str(), "invite");
    }
}
