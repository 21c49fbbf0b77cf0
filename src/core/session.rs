//! # Session handle.
//!
//! [`Session`] is the consumer-facing API. It is cheap to clone; every clone
//! talks to the same driver task. Operations that change the connection
//! enqueue a command and return immediately; observables read shared state.
//!
//! ## Teardown
//! - [`Session::shutdown`] disconnects and waits until the driver has exited.
//! - Dropping the last handle does the same without waiting.
//!
//! Subscriptions survive reconnects; they end when unsubscribed or when the
//! session is torn down.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::core::driver::Command;
use crate::core::machine::ConnectionState;
use crate::core::shared::{Shared, StatusSnapshot};
use crate::core::{SessionBuilder, SessionConfig};
use crate::error::ConfigError;
use crate::events::{Bus, Event};
use crate::message::{Draft, Message};
use crate::subscribers::{MatchKey, Subscription};

struct Handle {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    bus: Bus,
}

/// A real-time session for one identity at a time.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Handle>,
}

impl Session {
    /// Starts building a session.
    pub fn builder(cfg: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        commands: mpsc::UnboundedSender<Command>,
        shared: Arc<Shared>,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(Handle {
                commands,
                shared,
                bus,
            }),
        }
    }

    fn command(&self, cmd: Command) {
        if self.inner.commands.send(cmd).is_err() {
            tracing::debug!(target: "shiftlink::session", "command dropped; session already closed");
        }
    }

    /// Opens a connection scoped to `identity`. No-op while connecting or connected,
    /// in which case the current identity stays in effect.
    ///
    /// Re-enables automatic reconnects after a `disconnect`.
    pub fn connect(&self, identity: impl Into<String>) -> Result<(), ConfigError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(ConfigError::EmptyIdentity);
        }
        self.command(Command::Connect { identity });
        Ok(())
    }

    /// Closes the connection and stops reconnecting. Idempotent.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Resets the reconnect budget and connects again with the last identity.
    pub fn retry_connection(&self) {
        self.command(Command::Retry);
    }

    /// Sends `draft` now if connected, otherwise queues it. Never fails.
    ///
    /// `originUserId` is filled with the identity of the connection that first
    /// carries the message.
    /// Returns the id the message goes out with.
    pub fn send_message(&self, draft: Draft) -> String {
        let message = draft.seal(None);
        let id = message.id.clone();
        self.command(Command::Send(message));
        id
    }

    /// Registers `callback` for inbound messages matching `key`.
    pub fn subscribe<K, F>(&self, key: K, callback: F) -> Subscription
    where
        K: Into<MatchKey>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.inner.shared.registry.subscribe(key, callback)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status() == ConnectionState::Connected
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.inner.shared.status.borrow().state
    }

    /// Most recent non-heartbeat inbound message.
    pub fn last_message(&self) -> Option<Message> {
        self.inner.shared.history.lock().latest().cloned()
    }

    /// Recent inbound messages, oldest first.
    pub fn message_history(&self) -> Vec<Message> {
        self.inner.shared.history.lock().to_vec()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.shared.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.shared.status.subscribe()
    }

    /// Lifecycle events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Disconnects and waits for the driver to exit.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.inner.commands.send(Command::Shutdown { ack }).is_ok() {
            let _ = done.await;
        }
    }
}
