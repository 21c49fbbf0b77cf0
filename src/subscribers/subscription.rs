use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::message::MessageKind;
use crate::subscribers::registry::RegistryInner;

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKey {
    /// Exactly one message type.
    Kind(MessageKind),
    /// Every message type (wildcard).
    Any,
}

impl From<MessageKind> for MatchKey {
    fn from(kind: MessageKind) -> Self {
        MatchKey::Kind(kind)
    }
}

/// Handle returned by `subscribe`.
///
/// [`unsubscribe`](Subscription::unsubscribe) is idempotent and stays safe after
/// the owning session has been torn down. Clones share the same state.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    key: MatchKey,
    registry: Weak<RegistryInner>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new(id: u64, key: MatchKey, registry: Weak<RegistryInner>) -> Self {
        Self {
            id,
            key,
            registry,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registry-unique id (also the registration order).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> MatchKey {
        self.key
    }

    /// Removes the callback. Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.key, self.id),
            None => false,
        }
    }

    /// True until unsubscribed or the registry is gone.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}
