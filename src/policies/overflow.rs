//! # Outbound overflow policy
//!
//! Decides what happens when a message is submitted while the outbound queue
//! is already at capacity.
//!
//! ## Variants
//! - `DropOldest`: evict the front of the queue and append the new message.
//! - `RejectNew`: keep the queue as is and discard the new message.
//!
//! Either way the discarded message is logged and reported on the event bus.

/// Policy applied when the outbound queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued message (default).
    ///
    /// Use when the latest state matters more than history,
    /// e.g. task status updates that supersede each other.
    #[default]
    DropOldest,

    /// Discard the newly submitted message.
    ///
    /// Use when the earliest submissions must survive,
    /// e.g. a hand-off sequence that is meaningless without its start.
    RejectNew,
}

impl OverflowPolicy {
    /// Stable snake_case label for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            OverflowPolicy::DropOldest => "drop_oldest",
            OverflowPolicy::RejectNew => "reject_new",
        }
    }
}
