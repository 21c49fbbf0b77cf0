//! Message buffers owned by a session.
//!
//! - [`HistoryBuffer`] recent inbound messages (bounded, heartbeats excluded)
//! - [`OutboundQueue`] outbound messages waiting for a connection

mod history;
mod outbound;

pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
pub use outbound::{DEFAULT_OUTBOUND_CAPACITY, Drained, Enqueued, OutboundQueue};
