//! Session events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` with a per-bus sequence
//!
//! ## Quick reference
//! - **Publishers**: the session driver and the alert [`Notifier`](crate::alerts::Notifier).
//! - **Consumers**: anything holding a receiver from `Session::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
