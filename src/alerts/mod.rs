//! Platform alerts for inbound `notification` messages.
//!
//! - [`AlertSink`] the platform seam ([`NoopAlerts`] by default)
//! - [`Notifier`] the fire-and-forget dispatcher the session calls after subscriber dispatch

mod notifier;
mod sink;

pub use notifier::Notifier;
pub use sink::{Alert, AlertSink, NoopAlerts, Permission};
