use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of wire messages.
///
/// Serialized in snake_case (`"task_update"`). Unknown values fail decoding,
/// so a typo on either side is a dropped frame rather than a silently
/// unmatched subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// User-facing notification; may raise a platform alert.
    Notification,
    /// A checklist task changed.
    TaskUpdate,
    /// A review was requested, approved or rejected.
    ReviewUpdate,
    /// A multi-step workflow advanced.
    WorkflowUpdate,
    /// Manager or system-wide announcement.
    SystemAnnouncement,
    /// Keepalive. Never recorded in history nor dispatched to subscribers.
    Heartbeat,
}

impl MessageKind {
    /// Number of variants; sizes the registry's dispatch table.
    pub const COUNT: usize = 6;

    /// All variants in declaration order.
    pub const ALL: [MessageKind; Self::COUNT] = [
        MessageKind::Notification,
        MessageKind::TaskUpdate,
        MessageKind::ReviewUpdate,
        MessageKind::WorkflowUpdate,
        MessageKind::SystemAnnouncement,
        MessageKind::Heartbeat,
    ];

    /// Dense index in `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            MessageKind::Notification => 0,
            MessageKind::TaskUpdate => 1,
            MessageKind::ReviewUpdate => 2,
            MessageKind::WorkflowUpdate => 3,
            MessageKind::SystemAnnouncement => 4,
            MessageKind::Heartbeat => 5,
        }
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::Notification => "notification",
            MessageKind::TaskUpdate => "task_update",
            MessageKind::ReviewUpdate => "review_update",
            MessageKind::WorkflowUpdate => "workflow_update",
            MessageKind::SystemAnnouncement => "system_announcement",
            MessageKind::Heartbeat => "heartbeat",
        }
    }

    #[inline]
    pub fn is_heartbeat(self) -> bool {
        matches!(self, MessageKind::Heartbeat)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
