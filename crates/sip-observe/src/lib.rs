// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observability hooks for the user agent.
//!
//! Transports and the dialog registry report through a process-wide
//! [`UaMetrics`] sink. Nothing is reported until a sink is installed.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use sip_observe::{set_metrics, TracingMetrics};
//! set_metrics(Arc::new(TracingMetrics));
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::Level;

/// Metrics sink for packet and dialog events.
///
/// `transport` and `stage` are low-cardinality labels such as `"udp"` and
/// `"decode"`; Call-IDs never flow through here.
pub trait UaMetrics: Send + Sync + 'static {
    fn on_packet_received(&self, transport: &str);
    fn on_packet_sent(&self, transport: &str);
    fn on_error(&self, transport: &str, stage: &str);
    fn on_dialog_created(&self, server: bool);
    fn on_dialog_terminated(&self, active: usize);
}

#[derive(Debug, Default)]
struct NoopMetrics;

impl UaMetrics for NoopMetrics {
    fn on_packet_received(&self, _transport: &str) {}
    fn on_packet_sent(&self, _transport: &str) {}
    fn on_error(&self, _transport: &str, _stage: &str) {}
    fn on_dialog_created(&self, _server: bool) {}
    fn on_dialog_terminated(&self, _active: usize) {}
}

static METRICS: OnceCell<Arc<dyn UaMetrics>> = OnceCell::new();
static NOOP_METRICS: NoopMetrics = NoopMetrics;

/// Installs the global metrics sink.
///
/// Returns `false` if one was already installed.
pub fn set_metrics(metrics: Arc<dyn UaMetrics>) -> bool {
    METRICS.set(metrics).is_ok()
}

/// Returns the installed sink, or a no-op one.
pub fn metrics() -> &'static dyn UaMetrics {
    METRICS
        .get()
        .map(|arc| arc.as_ref())
        .unwrap_or(&NOOP_METRICS)
}

/// Span wrapping the handling of one packet on `transport`.
pub fn span_with_transport(name: &'static str, transport: &str) -> tracing::Span {
    tracing::span!(Level::DEBUG, "transport", op = name, transport = transport)
}

/// Sink that reports every event as a `tracing` event.
#[derive(Debug, Default)]
pub struct TracingMetrics;

impl UaMetrics for TracingMetrics {
    fn on_packet_received(&self, transport: &str) {
        tracing::trace!(transport, "packet received");
    }

    fn on_packet_sent(&self, transport: &str) {
        tracing::trace!(transport, "packet sent");
    }

    fn on_error(&self, transport: &str, stage: &str) {
        tracing::warn!(transport, stage, "transport error");
    }

    fn on_dialog_created(&self, server: bool) {
        tracing::debug!(server, "dialog created");
    }

    fn on_dialog_terminated(&self, active: usize) {
        tracing::debug!(active, "dialog terminated");
    }
}
