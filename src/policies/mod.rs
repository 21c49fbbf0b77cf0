//! Reconnect and buffering policies.
//!
//! This module groups the knobs that control **when** the session reconnects,
//! **how long** it waits between attempts, and what happens to outbound
//! traffic that piles up while disconnected.
//!
//! ## Contents
//! - [`BackoffPolicy`] how reconnect delays evolve (base / factor / max + jitter)
//! - [`JitterPolicy`] randomization to avoid synchronized reconnects
//! - [`ReconnectPolicy`] attempt counter and current delay, reset on success
//! - [`OverflowPolicy`] drop-oldest vs. reject-new for the outbound queue
//!
//! ## Quick wiring
//! ```text
//! SessionConfig { reconnect: BackoffPolicy, max_reconnect_attempts, overflow, .. }
//!      └─► core::driver::Driver uses:
//!           - ReconnectPolicy::advance() on every unexpected close
//!           - ReconnectPolicy::reset() on every successful open
//!           - OverflowPolicy when OutboundQueue is full
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → base=1s, factor=2.0, max=30s, jitter=None.
//! - `OverflowPolicy::DropOldest`.

mod backoff;
mod jitter;
mod overflow;
mod reconnect;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use overflow::OverflowPolicy;
pub use reconnect::ReconnectPolicy;
