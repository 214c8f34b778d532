// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal SIP user agent (RFC 3261) for direct peer-to-peer calls.
//!
//! [`UserAgentCore`] keeps the Call-ID to dialog registry, decodes inbound
//! datagrams, records transactions and dispatches to a
//! [`UserAgentHandler`]. [`UserAgent`] runs a core on one tokio task and
//! [`UserAgentHandle`] lets other tasks reach it.
//!
//! There are no proxies, registration, authentication or timers: requests
//! go straight to the To URI and a stalled peer leaves its dialog as it was.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use sip_core::SipUri;
//! use sip_transport::UdpTransport;
//! use sip_ua::{UserAgentConfig, UserAgentCore};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = UserAgentConfig::new("127.0.0.1", 5060, "udp")?;
//! let transport = Arc::new(UdpTransport::bind(&config.host, config.port).await?);
//! let mut ua: UserAgentCore<()> = UserAgentCore::new(config, transport)?;
//! let target = SipUri::parse("sip:bob@127.0.0.1:5070").unwrap();
//! let invite = ua.create_invite("alice", target)?;
//! ua.send_request(invite)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handler;
mod runtime;
mod user_agent;

pub use config::UserAgentConfig;
pub use error::UaError;
pub use handler::UserAgentHandler;
pub use runtime::{CommandInbox, UserAgent, UserAgentHandle};
pub use user_agent::UserAgentCore;
