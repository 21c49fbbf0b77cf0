//! # Connection state machine.
//!
//! ```text
//!                 Connect                Opened
//!   Disconnected ─────────► Connecting ─────────► Connected
//!        ▲   ▲                 │    │                │  │
//!        │   │   Connect       │    │TransportError  │  │TransportError
//!        │   └──── Error ◄─────┼────┴────────────────┘  │
//!        │           │         │                        │
//!        └─Closed────┴─────────┴──────── Closed ────────┘
//!
//!   Disconnect: any state ──► Disconnected
//! ```
//!
//! [`next_state`] is the only place transitions are decided. `None` means the
//! trigger does not apply in the current state and must be ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }

    /// True while a link is being opened or is open.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Caller (or reconnect timer) asked for a connection.
    Connect,
    /// The transport finished opening.
    Opened,
    /// The transport reported a failure.
    TransportError,
    /// The transport closed.
    Closed,
    /// Caller asked to disconnect.
    Disconnect,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::Connect,
        Trigger::Opened,
        Trigger::TransportError,
        Trigger::Closed,
        Trigger::Disconnect,
    ];
}

/// Returns the state after `trigger`, or `None` if `trigger` is ignored in `state`.
pub fn next_state(state: ConnectionState, trigger: Trigger) -> Option<ConnectionState> {
    use ConnectionState::*;

    match (state, trigger) {
        (_, Trigger::Disconnect) => Some(Disconnected),
        (Disconnected | Error, Trigger::Connect) => Some(Connecting),
        (Connecting, Trigger::Opened) => Some(Connected),
        (Connecting | Connected, Trigger::TransportError) => Some(Error),
        (Connecting | Connected | Error, Trigger::Closed) => Some(Disconnected),
        _ => None,
    }
}
