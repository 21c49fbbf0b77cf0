//! # Message subscribers.
//!
//! Local consumers register plain callbacks keyed by [`MessageKind`] or by the
//! wildcard [`MatchKey::Any`]. The session driver calls
//! [`SubscriberRegistry::dispatch`] once per inbound (non-heartbeat) message.
//!
//! ## Architecture
//! ```text
//! Link ── frame ──► Driver ──► HistoryBuffer
//!                     │
//!                     └──► SubscriberRegistry::dispatch(&Message)
//!                               │
//!                     ┌─────────┼──────────┬────────────┐
//!                     ▼         ▼          ▼            ▼
//!                  exact[k]   exact[k]   wildcard    wildcard     (registration order)
//! ```
//!
//! ## Example
//! ```no_run
//! use shiftlink::{MatchKey, Message, MessageKind, SubscriberRegistry};
//!
//! let registry = SubscriberRegistry::new();
//! let tasks = registry.subscribe(MessageKind::TaskUpdate, |m: &Message| {
//!     println!("task changed: {:?}", m.payload_str("title"));
//! });
//! let audit = registry.subscribe(MatchKey::Any, |m: &Message| {
//!     println!("[{}] {}", m.kind, m.id);
//! });
//! tasks.unsubscribe();
//! # drop(audit);
//! ```
//!
//! Callbacks run on the session's driver task: keep them short and hand
//! heavy work to a channel or a spawned task.

mod registry;
mod subscription;

use std::sync::Arc;

use crate::message::Message;

pub use registry::{DispatchReport, SubscriberRegistry};
pub(crate) use registry::panic_message;
pub use subscription::{MatchKey, Subscription};

/// Shared callback type stored by the registry.
pub type Callback = Arc<dyn Fn(&Message) + Send + Sync + 'static>;
