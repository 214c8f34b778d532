use std::fmt;

use crate::{Method, MessageError};

/// CSeq header: sequence number and method (RFC 3261 §20.16).
///
/// The sequence number is always in `1..=u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CSeq {
    seq: u32,
    method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Result<Self, MessageError> {
        if seq == 0 {
            return Err(MessageError::InvalidCSeq { seq: 0 });
        }
        Ok(Self { seq, method })
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Parses `"<seq> <method>"`.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let seq: u32 = parts.next()?.parse().ok()?;
        let method = Method::from_token(parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Self::new(seq, method).ok()
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}
