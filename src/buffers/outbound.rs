//! # Outbound queue: messages submitted while the link is down.
//!
//! ## Rules
//! - FIFO; flushed in submission order once the session is connected.
//! - Bounded by `limit` (`None` = unbounded); overflow resolved by [`OverflowPolicy`].
//! - [`drain_into`](OutboundQueue::drain_into) takes the whole batch out before
//!   sending, so anything enqueued meanwhile waits for the next drain and is
//!   never sent twice.
//! - A failed send stops the drain; the failed message and everything after it
//!   go back to the front, ahead of entries enqueued during the drain.

use std::collections::VecDeque;

use crate::message::Message;
use crate::policies::OverflowPolicy;

/// Default queue bound.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Result of [`OutboundQueue::enqueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// Stored without loss.
    Accepted,
    /// Stored; the returned (oldest) message was evicted to make room.
    Evicted(Message),
    /// Not stored; the queue was full and the policy rejects new messages.
    Rejected(Message),
}

/// Outcome of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    /// Messages accepted by the sender.
    pub sent: usize,
    /// Messages put back because the sender failed.
    pub requeued: usize,
}

/// FIFO buffer for outbound messages.
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<Message>,
    limit: Option<usize>,
    policy: OverflowPolicy,
}

impl OutboundQueue {
    /// Creates an empty queue. `limit = None` means unbounded; `Some(0)` is clamped to 1.
    pub fn new(limit: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            items: VecDeque::new(),
            limit: limit.map(|n| n.max(1)),
            policy,
        }
    }

    /// Appends `message`, applying the overflow policy when full.
    pub fn enqueue(&mut self, message: Message) -> Enqueued {
        match self.limit {
            Some(limit) if self.items.len() >= limit => match self.policy {
                OverflowPolicy::RejectNew => Enqueued::Rejected(message),
                OverflowPolicy::DropOldest => {
                    let evicted = self.items.pop_front();
                    self.items.push_back(message);
                    match evicted {
                        Some(old) => Enqueued::Evicted(old),
                        None => Enqueued::Accepted,
                    }
                }
            },
            _ => {
                self.items.push_back(message);
                Enqueued::Accepted
            }
        }
    }

    /// Puts `batch` back at the front, preserving its order.
    ///
    /// Used for messages a dying link never delivered. When the bound is exceeded
    /// the oldest entries are dropped and returned.
    pub fn requeue_front(&mut self, batch: Vec<Message>) -> Vec<Message> {
        for message in batch.into_iter().rev() {
            self.items.push_front(message);
        }
        let mut dropped = Vec::new();
        if let Some(limit) = self.limit {
            while self.items.len() > limit {
                if let Some(old) = self.items.pop_front() {
                    dropped.push(old);
                }
            }
        }
        dropped
    }

    /// Sends every queued message in order through `send`.
    ///
    /// `send` returns the message back on failure; draining stops there and the
    /// unsent tail is requeued in front of anything enqueued meanwhile.
    pub fn drain_into<F>(&mut self, mut send: F) -> Drained
    where
        F: FnMut(Message) -> Result<(), Message>,
    {
        let mut batch = std::mem::take(&mut self.items);
        let mut sent = 0;

        while let Some(message) = batch.pop_front() {
            if let Err(unsent) = send(message) {
                batch.push_front(unsent);
                let requeued = batch.len();
                batch.extend(self.items.drain(..));
                self.items = batch;
                return Drained { sent, requeued };
            }
            sent += 1;
        }
        Drained { sent, requeued: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Draft, MessageKind};

    fn msg(n: usize) -> Message {
        Draft::new(MessageKind::TaskUpdate)
            .with_id(format!("m-{n}"))
            .seal(Some("u1"))
    }

    fn ids<'a>(it: impl Iterator<Item = &'a Message>) -> Vec<String> {
        it.map(|m| m.id.clone()).collect()
    }

    #[test]
    fn drains_in_submission_order_and_empties() {
        let mut q = OutboundQueue::new(None, OverflowPolicy::DropOldest);
        for n in 0..6 {
            assert_eq!(q.enqueue(msg(n)), Enqueued::Accepted);
        }
        let mut wire = Vec::new();
        let drained = q.drain_into(|m| {
            wire.push(m.id);
            Ok(())
        });
        assert_eq!(drained, Drained { sent: 6, requeued: 0 });
        assert_eq!(wire, ["m-0", "m-1", "m-2", "m-3", "m-4", "m-5"]);
        assert!(q.is_empty());
    }

    #[test]
    fn failed_send_requeues_tail_in_order() {
        let mut q = OutboundQueue::new(None, OverflowPolicy::DropOldest);
        for n in 0..4 {
            q.enqueue(msg(n));
        }
        let mut wire = Vec::new();
        let drained = q.drain_into(|m| {
            if m.id == "m-2" {
                return Err(m);
            }
            wire.push(m.id);
            Ok(())
        });
        assert_eq!(drained, Drained { sent: 2, requeued: 2 });
        assert_eq!(wire, ["m-0", "m-1"]);
        assert_eq!(ids(q.iter()), ["m-2", "m-3"]);

        let mut retry = Vec::new();
        q.drain_into(|m| {
            retry.push(m.id);
            Ok(())
        });
        assert_eq!(retry, ["m-2", "m-3"]);
        assert!(q.is_empty());
    }

    #[test]
    fn drop_oldest_evicts_front() {
        let mut q = OutboundQueue::new(Some(2), OverflowPolicy::DropOldest);
        q.enqueue(msg(0));
        q.enqueue(msg(1));
        match q.enqueue(msg(2)) {
            Enqueued::Evicted(old) => assert_eq!(old.id, "m-0"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ids(q.iter()), ["m-1", "m-2"]);
    }

    #[test]
    fn reject_new_keeps_existing() {
        let mut q = OutboundQueue::new(Some(2), OverflowPolicy::RejectNew);
        q.enqueue(msg(0));
        q.enqueue(msg(1));
        match q.enqueue(msg(2)) {
            Enqueued::Rejected(m) => assert_eq!(m.id, "m-2"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ids(q.iter()), ["m-0", "m-1"]);
    }

    #[test]
    fn requeue_front_goes_ahead_of_newer_entries() {
        let mut q = OutboundQueue::new(Some(4), OverflowPolicy::DropOldest);
        q.enqueue(msg(10));
        let dropped = q.requeue_front(vec![msg(1), msg(2)]);
        assert!(dropped.is_empty());
        assert_eq!(ids(q.iter()), ["m-1", "m-2", "m-10"]);

        let dropped = q.requeue_front(vec![msg(0), msg(3)]);
        assert_eq!(ids(dropped.iter()), ["m-0"]);
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let q = OutboundQueue::new(Some(0), OverflowPolicy::RejectNew);
        assert_eq!(q.limit(), Some(1));
    }
}
