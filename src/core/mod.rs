//! # Session runtime.
//!
//! Wires the pieces of one session together: the consumer-facing
//! [`Session`] handle, the single driver task that owns all connection
//! state, the per-connection link pump and the timers.
//!
//! ```text
//! SessionBuilder::build()
//!   ├─► Bus, Shared { registry, history, status }, Notifier
//!   └─► spawn Driver::run(commands, inputs)
//!
//! Session ──Command──► Driver ──spawn──► link pump ──Input::Link──► Driver
//!                        ├──► Heartbeat ticker ─────Input::HeartbeatTick──► Driver
//!                        └──► ReconnectTimer ───────Input::ReconnectDue───► Driver
//! ```

mod builder;
mod config;
mod driver;
mod heartbeat;
mod link;
mod machine;
mod session;
mod shared;
mod timer;

#[cfg(test)]
mod scenarios;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use machine::{ConnectionState, Trigger, next_state};
pub use session::Session;
pub use shared::StatusSnapshot;
