// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core SIP message model for the robot user agent.
//!
//! This crate provides the typed values the rest of the workspace works on:
//! - **Messages**: [`Request`], [`Response`], [`SipMessage`] and their shared
//!   [`MessageHeaders`]
//! - **Addresses**: [`SipUri`], [`NameAddr`] and the From/To [`PartyHeader`]
//! - **Routing**: [`ViaHeader`] with its branch parameter
//! - **Sequencing**: [`CSeq`] and [`Method`]
//!
//! Construction validates the few invariants the protocol relies on: status
//! codes stay within 100-699, CSeq numbers are non-zero, and every request
//! carries at least one Via.
//!
//! # Examples
//!
//! ```
//! # use sip_core::*;
//! let uri = SipUri::parse("sip:alice@example.com").unwrap();
//! let from = PartyHeader::new(NameAddr::new(uri), Some("initiator-1".into()));
//! assert_eq!(from.to_string(), "<sip:alice@example.com>;tag=initiator-1");
//! ```

pub mod cseq;
pub mod headers;
pub mod method;
pub mod msg;
pub mod name_addr;
mod params;
pub mod uri;
pub mod via;

pub use cseq::CSeq;
pub use headers::{Header, Headers};
pub use method::Method;
pub use msg::{
    reason_phrase, MessageError, MessageHeaders, Request, Response, SipMessage, StatusLine,
    DEFAULT_MAX_FORWARDS,
};
pub use name_addr::{NameAddr, PartyHeader};
pub use params::Params;
pub use uri::SipUri;
pub use via::{ViaHeader, BRANCH_MAGIC_COOKIE};
