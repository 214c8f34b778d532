// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Datagram transport for the user agent.
//!
//! [`Transport`] is the byte-send contract the user-agent core depends on.
//! [`UdpTransport`] implements it over a tokio socket: sends are queued onto a
//! writer task so callers never await, and [`run_udp`] feeds received
//! datagrams into an [`InboundPacket`] channel.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use sip_observe::{metrics, span_with_transport};
use smol_str::SmolStr;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const MAX_DATAGRAM: usize = 65_535;

/// Indicates which transport carried an inbound or outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    Tcp,
}

impl TransportKind {
    /// Returns the lowercase transport string for metrics and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
        }
    }

    /// Returns the Via header transport token.
    ///
    /// ```
    /// use sip_transport::TransportKind;
    ///
    /// assert_eq!(TransportKind::Udp.via_transport(), "UDP");
    /// assert_eq!(TransportKind::Tcp.via_transport(), "TCP");
    /// ```
    pub fn via_transport(&self) -> &'static str {
        match self {
            TransportKind::Udp => "UDP",
            TransportKind::Tcp => "TCP",
        }
    }

    /// Parses a transport string (case-insensitive, surrounding whitespace ignored).
    ///
    /// ```
    /// use sip_transport::TransportKind;
    ///
    /// assert_eq!(TransportKind::parse(" UDP "), Some(TransportKind::Udp));
    /// assert_eq!(TransportKind::parse("tcp"), Some(TransportKind::Tcp));
    /// assert_eq!(TransportKind::parse("sctp"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Some(TransportKind::Udp),
            "tcp" => Some(TransportKind::Tcp),
            _ => None,
        }
    }
}

/// Bundle representing a datagram received by a transport listener.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub transport: TransportKind,
    pub peer: SocketAddr,
    pub payload: Bytes,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport writer has shut down")]
    Closed,
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-level send contract used by the user-agent core.
///
/// `send` must not block; implementations queue the payload and report
/// delivery failures through logging and metrics.
pub trait Transport: Send + Sync {
    fn send(&self, payload: Bytes, host: &str, port: u16) -> Result<(), TransportError>;
}

#[derive(Debug)]
struct Outbound {
    payload: Bytes,
    host: SmolStr,
    port: u16,
}

/// UDP transport bound to a single local socket.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl UdpTransport {
    /// Binds `host:port` and spawns the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(host: &str, port: u16) -> Result<Self, TransportError> {
        let socket = Arc::new(UdpSocket::bind((host, port)).await?);
        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(socket.clone(), rx));
        Ok(Self { socket, outbound })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Starts delivering received datagrams to `tx`.
    pub fn listen(&self, tx: mpsc::Sender<InboundPacket>) -> JoinHandle<Result<()>> {
        tokio::spawn(run_udp(self.socket.clone(), tx))
    }
}

impl Transport for UdpTransport {
    fn send(&self, payload: Bytes, host: &str, port: u16) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound {
                payload,
                host: SmolStr::new(host),
                port,
            })
            .map_err(|_| TransportError::Closed)
    }
}

async fn write_loop(socket: Arc<UdpSocket>, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(out) = rx.recv().await {
        let target = (out.host.as_str(), out.port);
        match socket.send_to(&out.payload, target).await {
            Ok(_) => metrics().on_packet_sent(TransportKind::Udp.as_str()),
            Err(e) => {
                warn!(host = %out.host, port = out.port, %e, "udp send failed");
                metrics().on_error(TransportKind::Udp.as_str(), "send");
            }
        }
    }
}

/// Receives datagrams until the consumer side of `tx` is dropped.
pub async fn run_udp(socket: Arc<UdpSocket>, tx: mpsc::Sender<InboundPacket>) -> Result<()> {
    let bind = socket.local_addr()?;
    info!(%bind, "listening (udp)");
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, peer)) => {
                let span = span_with_transport("udp_packet", TransportKind::Udp.as_str());
                let _entered = span.enter();
                if n == buf.len() {
                    metrics().on_error(TransportKind::Udp.as_str(), "truncate");
                    error!(%peer, max = n, "udp datagram likely truncated (buffer full)");
                }
                metrics().on_packet_received(TransportKind::Udp.as_str());
                let packet = InboundPacket {
                    transport: TransportKind::Udp,
                    peer,
                    payload: Bytes::copy_from_slice(&buf[..n]),
                };
                if tx.send(packet).await.is_err() {
                    info!("receiver dropped; shutting down udp loop");
                    break;
                }
            }
            Err(e) => {
                error!(%e, "udp recv_from error");
                metrics().on_error(TransportKind::Udp.as_str(), "recv");
            }
        }
    }
    Ok(())
}
