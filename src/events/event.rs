//! # Lifecycle events emitted by a session.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Connection events**: state changes, reconnect scheduling and exhaustion
//! - **Liveness events**: heartbeats sent/received, liveness window expiry
//! - **Delivery events**: outbound queueing, overflow and flushes, dropped frames
//! - **Side-channel events**: subscriber panics, failed alerts, session close
//!
//! The [`Event`] struct carries the metadata relevant to its kind.
//!
//! ## Ordering guarantees
//! `seq` is assigned by the [`Bus`](crate::events::Bus) at publish time and is
//! strictly increasing per session. Two sessions never share a counter.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use shiftlink::{ConnectionState, Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReconnectScheduled)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(4));
//!
//! assert_eq!(ev.delay_ms, Some(4_000));
//! assert_eq!(ev.attempt, Some(2));
//!
//! let changed = Event::state_changed(ConnectionState::Connecting, ConnectionState::Connected);
//! assert_eq!(changed.to, Some(ConnectionState::Connected));
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::ConnectionState;

/// Classification of session events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Connection ===
    /// Connection state moved.
    ///
    /// Sets:
    /// - `from`, `to`: previous and new state
    /// - `reason`: transport error text (only when `to == Error`)
    StateChanged,

    /// A reconnect timer was armed.
    ///
    /// Sets:
    /// - `attempt`: attempt number the timer will perform (1-based)
    /// - `delay_ms`: delay before the attempt
    ReconnectScheduled,

    /// Attempts are exhausted; the session stays disconnected until `retry_connection`.
    ///
    /// Sets:
    /// - `attempt`: attempts made
    ReconnectExhausted,

    // === Liveness ===
    /// A heartbeat frame was written to the link.
    HeartbeatSent,

    /// A heartbeat frame arrived from the server.
    ///
    /// Sets:
    /// - `message_id`: id of the heartbeat frame
    HeartbeatReceived,

    /// Nothing arrived within the liveness window; the link is being closed.
    ///
    /// Sets:
    /// - `delay_ms`: configured window
    LivenessLost,

    // === Delivery ===
    /// An inbound frame could not be decoded and was dropped.
    ///
    /// Sets:
    /// - `reason`: decode error
    FrameDropped,

    /// An outbound message was queued because the link is down.
    ///
    /// Sets:
    /// - `message_id`: queued message
    OutboundQueued,

    /// The outbound queue was full and a message was lost.
    ///
    /// Sets:
    /// - `message_id`: the evicted (or rejected) message
    /// - `reason`: `"drop_oldest"` or `"reject_new"`
    OutboundOverflow,

    /// Queued messages were handed to a fresh link.
    ///
    /// Sets:
    /// - `attempt`: number of messages flushed
    OutboundFlushed,

    // === Side channels ===
    /// A subscriber callback panicked during dispatch.
    ///
    /// Sets:
    /// - `message_id`: message being dispatched
    /// - `reason`: panic message
    SubscriberPanicked,

    /// A platform alert failed or panicked.
    ///
    /// Sets:
    /// - `message_id`: triggering notification
    /// - `reason`: failure text
    AlertFailed,

    /// The session was torn down; no further events follow.
    SessionClosed,
}

impl EventKind {
    /// Stable snake_case label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::StateChanged => "state_changed",
            EventKind::ReconnectScheduled => "reconnect_scheduled",
            EventKind::ReconnectExhausted => "reconnect_exhausted",
            EventKind::HeartbeatSent => "heartbeat_sent",
            EventKind::HeartbeatReceived => "heartbeat_received",
            EventKind::LivenessLost => "liveness_lost",
            EventKind::FrameDropped => "frame_dropped",
            EventKind::OutboundQueued => "outbound_queued",
            EventKind::OutboundOverflow => "outbound_overflow",
            EventKind::OutboundFlushed => "outbound_flushed",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::AlertFailed => "alert_failed",
            EventKind::SessionClosed => "session_closed",
        }
    }
}

/// Session event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Per-session sequence number (assigned on publish).
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Previous connection state.
    pub from: Option<ConnectionState>,
    /// New connection state.
    pub to: Option<ConnectionState>,
    /// Attempt number or count, depending on kind.
    pub attempt: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Related message id.
    pub message_id: Option<Arc<str>>,
}

impl Event {
    /// Creates an event of the given kind stamped with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            from: None,
            to: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            message_id: None,
        }
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_message(mut self, id: impl Into<Arc<str>>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a state change event.
    #[inline]
    pub fn state_changed(from: ConnectionState, to: ConnectionState) -> Self {
        let mut ev = Event::new(EventKind::StateChanged);
        ev.from = Some(from);
        ev.to = Some(to);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(message_id: &str, info: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_message(message_id)
            .with_reason(info)
    }

    #[inline]
    pub fn is_state_change(&self) -> bool {
        matches!(self.kind, EventKind::StateChanged)
    }
}
