use anyhow::Result;
use sip_transport::InboundPacket;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

use crate::{UaError, UserAgentCore, UserAgentHandler};

type Command<T, H> = Box<dyn FnOnce(&mut UserAgentCore<T>, &mut H) + Send>;

/// Cloneable handle for running closures on a [`UserAgent`] worker.
pub struct UserAgentHandle<T, H> {
    commands: mpsc::Sender<Command<T, H>>,
}

impl<T, H> Clone for UserAgentHandle<T, H> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

/// Receiving half created alongside a [`UserAgentHandle`].
pub struct CommandInbox<T, H> {
    commands: mpsc::Receiver<Command<T, H>>,
}

impl<T, H> UserAgentHandle<T, H>
where
    T: 'static,
    H: 'static,
{
    /// Creates a handle and the inbox a [`UserAgent`] drains.
    ///
    /// The pair is created before the agent so handlers can hold a handle
    /// for deferred work.
    pub fn channel(capacity: usize) -> (Self, CommandInbox<T, H>) {
        let (commands, rx) = mpsc::channel(capacity);
        (Self { commands }, CommandInbox { commands: rx })
    }

    /// Runs `f` on the worker between packets and returns its result.
    pub async fn run<F, R>(&self, f: F) -> Result<R, UaError>
    where
        F: FnOnce(&mut UserAgentCore<T>, &mut H) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let command: Command<T, H> = Box::new(move |core, handler| {
            let _ = tx.send(f(core, handler));
        });
        self.commands
            .send(command)
            .await
            .map_err(|_| UaError::WorkerStopped)?;
        rx.await.map_err(|_| UaError::WorkerStopped)
    }
}

/// Single-task driver that owns a [`UserAgentCore`] and its handler.
///
/// Packets and commands are processed one at a time, so each runs to
/// completion before the next touches a dialog.
pub struct UserAgent<T, H> {
    core: UserAgentCore<T>,
    handler: H,
    inbox: CommandInbox<T, H>,
}

impl<T, H> UserAgent<T, H>
where
    H: UserAgentHandler<T>,
{
    pub fn new(core: UserAgentCore<T>, handler: H, inbox: CommandInbox<T, H>) -> Self {
        Self {
            core,
            handler,
            inbox,
        }
    }

    pub fn core(&self) -> &UserAgentCore<T> {
        &self.core
    }

    /// Processes packets until the packet channel closes.
    ///
    /// Errors raised while handling one packet or command are logged and do
    /// not stop the loop.
    pub async fn run(mut self, mut packets: mpsc::Receiver<InboundPacket>) -> Result<()> {
        info!(bind = %self.core.config().host_port(), "user agent started");
        if let Err(e) = self.handler.on_listening_started(&mut self.core) {
            warn!(%e, "listening hook failed");
        }

        let mut commands_open = true;
        loop {
            tokio::select! {
                packet = packets.recv() => match packet {
                    Some(packet) => self.handle_packet(packet),
                    None => break,
                },
                command = self.inbox.commands.recv(), if commands_open => match command {
                    Some(command) => command(&mut self.core, &mut self.handler),
                    None => commands_open = false,
                },
            }
        }
        info!("packet channel closed; user agent stopped");
        Ok(())
    }

    #[instrument(skip_all, fields(peer = %packet.peer))]
    fn handle_packet(&mut self, packet: InboundPacket) {
        if let Err(e) = self
            .core
            .on_incoming_bytes(&packet.payload, &mut self.handler)
        {
            warn!(%e, "dropping message");
        }
    }
}
