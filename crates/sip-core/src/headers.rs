use std::slice::Iter;

use smol_str::SmolStr;

use crate::MessageError;

/// Names, full and compact, carried by typed fields of `MessageHeaders`.
const RESERVED: &[&str] = &[
    "via",
    "v",
    "max-forwards",
    "from",
    "f",
    "to",
    "t",
    "call-id",
    "i",
    "cseq",
    "contact",
    "m",
    "content-type",
    "c",
    "content-length",
    "l",
];

/// Represents a single SIP header field as a name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: SmolStr,
    pub value: SmolStr,
}

/// Headers without a typed field on the message, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    /// Creates an empty header collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header to the collection; surrounding whitespace is dropped
    /// from the value.
    ///
    /// # Errors
    ///
    /// Fails for names that are not RFC 3261 tokens, for names with a typed
    /// field (Via, CSeq, Content-Length, ...) and for values containing
    /// control characters.
    pub fn push(
        &mut self,
        name: impl Into<SmolStr>,
        value: impl AsRef<str>,
    ) -> Result<(), MessageError> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(is_token_char) {
            return Err(MessageError::InvalidHeaderName(name));
        }
        if RESERVED.iter().any(|r| name.eq_ignore_ascii_case(r)) {
            return Err(MessageError::ReservedHeader(name));
        }
        let value = value.as_ref().trim();
        if value.chars().any(|c| c.is_control() && c != '\t') {
            return Err(MessageError::InvalidHeaderValue(name));
        }
        self.0.push(Header {
            name,
            value: SmolStr::new(value),
        });
        Ok(())
    }

    /// Returns an iterator over the stored headers.
    pub fn iter(&self) -> Iter<'_, Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finds the first header whose name matches ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&SmolStr> {
        self.0
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.value)
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_keeps_order() {
        let mut headers = Headers::new();
        headers.push("User-Agent", "robot").unwrap();
        headers.push("Subject", " first ").unwrap();
        headers.push("subject", "second").unwrap();
        assert_eq!(headers.get("user-agent").map(|v| v.as_str()), Some("robot"));
        assert_eq!(headers.get("SUBJECT").map(|v| v.as_str()), Some("first"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn typed_header_names_are_refused() {
        let mut headers = Headers::new();
        for name in ["Via", "v", "CSeq", "content-length", "Call-ID", "To"] {
            assert_eq!(
                headers.push(name, "x"),
                Err(MessageError::ReservedHeader(name.into()))
            );
        }
        assert!(headers.is_empty());
    }

    #[test]
    fn malformed_names_and_values_are_refused() {
        let mut headers = Headers::new();
        assert_eq!(
            headers.push("X Bad", "x"),
            Err(MessageError::InvalidHeaderName("X Bad".into()))
        );
        assert_eq!(
            headers.push("X-Evil", "a\r\nVia: injected"),
            Err(MessageError::InvalidHeaderValue("X-Evil".into()))
        );
        assert!(headers.is_empty());
    }
}
