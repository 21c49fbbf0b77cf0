//! # Type-indexed subscriber registry.
//!
//! Callers register callbacks for one [`MessageKind`] or for every kind
//! ([`MatchKey::Any`]). The session dispatches each inbound message through
//! [`SubscriberRegistry::dispatch`].
//!
//! ## Architecture
//! ```text
//! subscribe(key, f) ─► Table { exact: [Vec<Entry>; MessageKind::COUNT], wildcard: Vec<Entry> }
//!
//! dispatch(msg)
//!   ├─► read lock: snapshot exact[msg.kind] ∪ wildcard, ordered by registration id
//!   ├─► release lock
//!   └─► for entry in snapshot: catch_unwind(entry.callback(msg))
//!             └─► panic → logged, recorded in DispatchReport, next entry
//! ```
//!
//! ## Rules
//! - **Registration order**: exact and wildcard subscribers are interleaved by
//!   the order they subscribed in.
//! - **Snapshot**: subscribe/unsubscribe during a dispatch (including from inside
//!   a callback) never changes who that dispatch calls. Each callback fires at
//!   most once per dispatch.
//! - **Isolation**: a panicking callback does not prevent the others from running.
//! - The lock is never held while a callback runs, so callbacks may subscribe
//!   or unsubscribe freely.
//!
//! **Warning**: panics are caught with `AssertUnwindSafe`; a callback that panics
//! while holding its own lock may leave that state poisoned or inconsistent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::message::{Message, MessageKind};
use crate::subscribers::{Callback, MatchKey, Subscription};

/// A registered callback.
struct Entry {
    id: u64,
    registered_at: SystemTime,
    callback: Callback,
}

/// Enum-indexed dispatch table plus the wildcard bucket.
#[derive(Default)]
struct Table {
    exact: [Vec<Entry>; MessageKind::COUNT],
    wildcard: Vec<Entry>,
}

impl Table {
    fn bucket(&self, key: MatchKey) -> &Vec<Entry> {
        match key {
            MatchKey::Kind(kind) => &self.exact[kind.index()],
            MatchKey::Any => &self.wildcard,
        }
    }

    fn bucket_mut(&mut self, key: MatchKey) -> &mut Vec<Entry> {
        match key {
            MatchKey::Kind(kind) => &mut self.exact[kind.index()],
            MatchKey::Any => &mut self.wildcard,
        }
    }

    /// Exact + wildcard entries for `kind`, merged by registration id.
    fn snapshot(&self, kind: MessageKind) -> Vec<(u64, Callback)> {
        let exact = &self.exact[kind.index()];
        let wildcard = &self.wildcard;
        let mut out = Vec::with_capacity(exact.len() + wildcard.len());
        let (mut i, mut j) = (0, 0);

        while i < exact.len() || j < wildcard.len() {
            let take_exact = match (exact.get(i), wildcard.get(j)) {
                (Some(e), Some(w)) => e.id < w.id,
                (Some(_), None) => true,
                _ => false,
            };
            let entry = if take_exact {
                i += 1;
                &exact[i - 1]
            } else {
                j += 1;
                &wildcard[j - 1]
            };
            out.push((entry.id, Arc::clone(&entry.callback)));
        }
        out
    }
}

pub(crate) struct RegistryInner {
    table: RwLock<Table>,
    next_id: AtomicU64,
}

impl RegistryInner {
    pub(crate) fn remove(&self, key: MatchKey, id: u64) -> bool {
        let mut table = self.table.write();
        let bucket = table.bucket_mut(key);
        match bucket.iter().position(|e| e.id == id) {
            Some(pos) => {
                bucket.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Outcome of a single [`SubscriberRegistry::dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Subscription ids whose callback panicked, with the panic message.
    pub panicked: Vec<(u64, String)>,
}

/// Registry of message callbacks. Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                table: RwLock::new(Table::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `callback` for messages matching `key`.
    ///
    /// The returned handle removes it again; dropping the handle does **not** unsubscribe.
    pub fn subscribe<K, F>(&self, key: K, callback: F) -> Subscription
    where
        K: Into<MatchKey>,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let key = key.into();
        let callback: Callback = Arc::new(callback);
        let id = {
            // ids are taken under the write lock so every bucket stays sorted by id
            let mut table = self.inner.table.write();
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            table.bucket_mut(key).push(Entry {
                id,
                registered_at: SystemTime::now(),
                callback,
            });
            id
        };
        Subscription::new(id, key, self.downgrade())
    }

    /// Invokes every matching callback once, in registration order.
    pub fn dispatch(&self, message: &Message) -> DispatchReport {
        let snapshot = self.inner.table.read().snapshot(message.kind);
        let mut report = DispatchReport::default();

        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(message))) {
                Ok(()) => report.delivered += 1,
                Err(panic_err) => {
                    let info = panic_message(&*panic_err);
                    tracing::warn!(
                        target: "shiftlink::subscribers",
                        subscription = id,
                        kind = %message.kind,
                        message_id = %message.id,
                        panic = %info,
                        "subscriber panicked; continuing dispatch"
                    );
                    report.panicked.push((id, info));
                }
            }
        }
        report
    }

    /// Number of callbacks registered for exactly `key` (wildcards are not counted for kinds).
    pub fn count(&self, key: impl Into<MatchKey>) -> usize {
        self.inner.table.read().bucket(key.into()).len()
    }

    /// Total number of registered callbacks.
    pub fn len(&self) -> usize {
        let table = self.inner.table.read();
        table.wildcard.len() + table.exact.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registration time of a live subscription.
    pub fn registered_at(&self, subscription: &Subscription) -> Option<SystemTime> {
        self.inner
            .table
            .read()
            .bucket(subscription.key())
            .iter()
            .find(|e| e.id == subscription.id())
            .map(|e| e.registered_at)
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }
}

pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
