//! # Bounded history of received messages.
//!
//! Oldest entries are evicted once `capacity` is exceeded. Heartbeats are
//! rejected so keepalive traffic never pushes real messages out.

use std::collections::VecDeque;

use crate::message::Message;

/// Default number of retained messages.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Ring buffer of the most recent non-heartbeat messages, in arrival order.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Creates an empty buffer. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message`, evicting the oldest entry if full.
    ///
    /// Returns `false` (and stores nothing) for heartbeats.
    pub fn push(&mut self, message: Message) -> bool {
        if message.is_heartbeat() {
            return false;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
        true
    }

    /// Entries oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// Copy of all entries oldest → newest.
    pub fn to_vec(&self) -> Vec<Message> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
