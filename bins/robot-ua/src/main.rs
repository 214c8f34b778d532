// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod answer;
mod call;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sip_core::SipUri;
use sip_observe::{set_metrics, TracingMetrics};
use sip_transport::UdpTransport;
use sip_ua::{UserAgent, UserAgentConfig, UserAgentCore, UserAgentHandle};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::answer::Answerer;
use crate::call::Caller;
use crate::settings::Settings;

/// Text of the MESSAGE requests received in a dialog.
pub type Transcript = Vec<String>;

/// Direct peer-to-peer SIP user agent that answers or places a single call.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local bind host, also used in Via and Contact
    #[arg(long)]
    host: Option<String>,
    /// Local bind port
    #[arg(long)]
    port: Option<u16>,
    /// Transport name (only udp is implemented)
    #[arg(long)]
    transport: Option<String>,
    /// User part of our own address
    #[arg(long)]
    user: Option<String>,
    /// JSON file supplying any of host, port, transport and user
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Wait for calls, answer them and hang up when the caller does
    Answer {
        /// Delay between 100 Trying and 200 OK
        #[arg(long, default_value_t = 1000)]
        answer_delay_ms: u64,
    },
    /// Call a peer and hang up after a while
    Call {
        /// Request-URI of the peer, e.g. sip:robot@127.0.0.1:5070
        #[arg(long)]
        target: String,
        /// Seconds to stay in the call before sending BYE
        #[arg(long, default_value_t = 5)]
        hangup_after: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    set_metrics(Arc::new(TracingMetrics));

    let args = Args::parse();
    let file = match &args.config {
        Some(path) => Some(Settings::load(path).await?),
        None => None,
    };
    let settings = Settings::merge(
        file,
        Settings {
            host: args.host,
            port: args.port,
            transport: args.transport,
            user: args.user,
        },
    );
    let user = settings.user();
    let config: UserAgentConfig = settings.into_config()?;

    let transport = Arc::new(UdpTransport::bind(&config.host, config.port).await?);
    let (packets, packets_rx) = mpsc::channel(1024);
    let listener = transport.listen(packets);
    let core: UserAgentCore<Transcript> = UserAgentCore::new(config, transport)?;

    match args.mode {
        Mode::Answer { answer_delay_ms } => {
            let (handle, inbox) = UserAgentHandle::channel(64);
            let answerer = Answerer::new(handle, Duration::from_millis(answer_delay_ms));
            let agent = UserAgent::new(core, answerer, inbox);
            info!(%user, "answering calls");
            tokio::select! {
                result = agent.run(packets_rx) => result?,
                result = listener => result??,
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
        Mode::Call {
            target,
            hangup_after,
        } => {
            let target = SipUri::parse(&target)
                .ok_or_else(|| anyhow!("invalid --target URI: {}", target))?;
            let (done, finished) = oneshot::channel();
            let (handle, inbox) = UserAgentHandle::channel(64);
            let caller = Caller::new(
                handle,
                user,
                target,
                Duration::from_secs(hangup_after),
                done,
            );
            let agent = UserAgent::new(core, caller, inbox);
            tokio::select! {
                result = agent.run(packets_rx) => result?,
                result = listener => result??,
                _ = finished => info!("call finished"),
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
    }
    Ok(())
}
