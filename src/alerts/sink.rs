//! # Platform alert facility.
//!
//! [`AlertSink`] is the seam to whatever shows user-visible notifications on the
//! host platform (desktop toast, mobile push bridge, terminal bell...). The
//! session only ever asks three things of it: the current permission, a
//! one-time permission request and "show this alert".
//!
//! ## Example (skeleton)
//! ```rust
//! use async_trait::async_trait;
//! use shiftlink::{Alert, AlertError, AlertSink, Permission};
//!
//! struct Bell;
//!
//! #[async_trait]
//! impl AlertSink for Bell {
//!     fn permission(&self) -> Permission {
//!         Permission::Granted
//!     }
//!     async fn request_permission(&self) -> Permission {
//!         Permission::Granted
//!     }
//!     async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
//!         println!("\x07{}: {}", alert.title, alert.body);
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::AlertError;
use crate::message::Message;

/// Whether the platform allows alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    #[default]
    Undetermined,
}

/// A user-visible alert derived from a `notification` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    /// Id of the message that triggered it.
    pub message_id: String,
}

impl Alert {
    const DEFAULT_TITLE: &'static str = "Notification";

    /// Builds an alert from payload fields `title` and `message` (or `body`).
    pub fn from_message(message: &Message) -> Self {
        let title = message
            .payload_str("title")
            .unwrap_or(Self::DEFAULT_TITLE)
            .to_string();
        let body = message
            .payload_str("message")
            .or_else(|| message.payload_str("body"))
            .unwrap_or_default()
            .to_string();
        Self {
            title,
            body,
            message_id: message.id.clone(),
        }
    }
}

/// Contract for platform alert facilities.
///
/// Called from tasks spawned by the session; implementations must not block the runtime.
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    /// Current permission, without prompting.
    fn permission(&self) -> Permission;

    /// Prompts for permission. Called at most once per session, at startup,
    /// and only while [`permission`](AlertSink::permission) is `Undetermined`.
    async fn request_permission(&self) -> Permission;

    /// Shows `alert`.
    async fn notify(&self, alert: &Alert) -> Result<(), AlertError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Sink that never shows anything. The default for new sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlerts;

#[async_trait]
impl AlertSink for NoopAlerts {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn notify(&self, _alert: &Alert) -> Result<(), AlertError> {
        Err(AlertError::Denied)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
