//! State readable from every `Session` handle.
//!
//! The driver is the only writer of `history` and `status`; handles read them.
//! The registry is mutated by callers directly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::buffers::HistoryBuffer;
use crate::core::ConnectionState;
use crate::subscribers::SubscriberRegistry;

/// Point-in-time view of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    /// Automatic reconnects since the last successful open.
    pub attempt: u32,
    /// Delay of the pending reconnect, if one is scheduled.
    pub next_delay: Option<Duration>,
    /// Messages waiting in the outbound queue.
    pub queued: usize,
    pub heartbeat_active: bool,
    pub reconnect_pending: bool,
    /// Receipt time of the last server heartbeat.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Identity of the current (or last) connection.
    pub identity: Option<String>,
}

impl StatusSnapshot {
    /// No timer of any kind is alive.
    pub fn is_quiescent(&self) -> bool {
        !self.heartbeat_active && !self.reconnect_pending
    }
}

pub(crate) struct Shared {
    pub(crate) registry: SubscriberRegistry,
    pub(crate) history: Mutex<HistoryBuffer>,
    pub(crate) status: watch::Sender<StatusSnapshot>,
}

impl Shared {
    pub(crate) fn new(history_capacity: usize) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            registry: SubscriberRegistry::new(),
            history: Mutex::new(HistoryBuffer::new(history_capacity)),
            status,
        }
    }

    /// Publishes `snapshot` if it differs from the current one.
    pub(crate) fn publish_status(&self, snapshot: StatusSnapshot) {
        self.status.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
