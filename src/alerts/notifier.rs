//! # Side-effect dispatcher for `notification` messages.
//!
//! ```text
//! Driver ── evaluate(&msg) ──► kind == notification && permission == Granted ?
//!                                    │ yes
//!                                    ▼
//!                     tokio::spawn(catch_unwind(sink.notify(&alert)))
//!                                    │ Err / panic
//!                                    ▼
//!                          warn! + Bus ◄── AlertFailed
//! ```
//!
//! ## Rules
//! - Fire-and-forget: `evaluate` never awaits the sink, so a slow or broken
//!   platform never delays dispatch, history or the connection.
//! - Failures and panics in the sink are logged and published; nothing else.
//! - A panicking `permission()` counts as denied.
//! - Permission is requested once, by [`Notifier::prime`], when it is still undetermined.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::alerts::{Alert, AlertSink, Permission};
use crate::events::{Bus, Event, EventKind};
use crate::message::{Message, MessageKind};
use crate::subscribers::panic_message;

/// Turns notification messages into platform alerts.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn AlertSink>,
    bus: Bus,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AlertSink>, bus: Bus) -> Self {
        Self { sink, bus }
    }

    /// Current permission; a panicking sink reads as [`Permission::Denied`].
    pub fn permission(&self) -> Permission {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.sink.permission())) {
            Ok(permission) => permission,
            Err(panic_err) => {
                let info = panic_message(&*panic_err);
                tracing::warn!(
                    target: "shiftlink::alerts",
                    sink = self.sink.name(),
                    panic = %info,
                    "permission check panicked"
                );
                Permission::Denied
            }
        }
    }

    /// Requests permission if it has never been decided. Returns the resulting permission.
    pub async fn prime(&self) -> Permission {
        let current = self.permission();
        if current != Permission::Undetermined {
            return current;
        }
        match AssertUnwindSafe(self.sink.request_permission())
            .catch_unwind()
            .await
        {
            Ok(permission) => {
                tracing::debug!(
                    target: "shiftlink::alerts",
                    sink = self.sink.name(),
                    ?permission,
                    "alert permission requested"
                );
                permission
            }
            Err(panic_err) => {
                let info = panic_message(&*panic_err);
                tracing::warn!(
                    target: "shiftlink::alerts",
                    sink = self.sink.name(),
                    panic = %info,
                    "permission request panicked"
                );
                Permission::Undetermined
            }
        }
    }

    /// Spawns an alert for `message` when it is a notification and alerts are allowed.
    ///
    /// Returns the handle of the spawned task, if any.
    pub fn evaluate(&self, message: &Message) -> Option<JoinHandle<()>> {
        if message.kind != MessageKind::Notification {
            return None;
        }
        if self.permission() != Permission::Granted {
            tracing::trace!(
                target: "shiftlink::alerts",
                message_id = %message.id,
                "alerts not permitted; skipping"
            );
            return None;
        }

        let alert = Alert::from_message(message);
        let sink = Arc::clone(&self.sink);
        let bus = self.bus.clone();

        Some(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(sink.notify(&alert)).catch_unwind().await;
            let reason = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(err)) => {
                    tracing::warn!(
                        target: "shiftlink::alerts",
                        sink = sink.name(),
                        message_id = %alert.message_id,
                        error = %err,
                        label = err.as_label(),
                        "alert failed"
                    );
                    err.to_string()
                }
                Err(panic_err) => {
                    let info = panic_message(&*panic_err);
                    tracing::warn!(
                        target: "shiftlink::alerts",
                        sink = sink.name(),
                        message_id = %alert.message_id,
                        panic = %info,
                        "alert sink panicked"
                    );
                    info
                }
            };
            bus.publish(
                Event::new(EventKind::AlertFailed)
                    .with_message(alert.message_id.as_str())
                    .with_reason(reason),
            );
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use crate::message::Draft;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    enum Behaviour {
        Ok,
        Fail,
        Panic,
        PanicOnPermission,
    }

    struct Recorder {
        permission: Mutex<Permission>,
        granted_on_request: Permission,
        requests: Mutex<u32>,
        shown: Mutex<Vec<Alert>>,
        behaviour: Behaviour,
    }

    impl Recorder {
        fn new(permission: Permission, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                permission: Mutex::new(permission),
                granted_on_request: Permission::Granted,
                requests: Mutex::new(0),
                shown: Mutex::new(Vec::new()),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl AlertSink for Recorder {
        fn permission(&self) -> Permission {
            if matches!(self.behaviour, Behaviour::PanicOnPermission) {
                panic!("permission store unavailable");
            }
            *self.permission.lock()
        }

        async fn request_permission(&self) -> Permission {
            *self.requests.lock() += 1;
            *self.permission.lock() = self.granted_on_request;
            self.granted_on_request
        }

        async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
            match self.behaviour {
                Behaviour::Ok => {
                    self.shown.lock().push(alert.clone());
                    Ok(())
                }
                Behaviour::Fail => Err(AlertError::Platform {
                    reason: "no display".into(),
                }),
                Behaviour::Panic | Behaviour::PanicOnPermission => panic!("sink exploded"),
            }
        }
    }

    fn notification() -> Message {
        Draft::new(MessageKind::Notification)
            .with_field("title", "Manager")
            .with_field("message", "Inventory count at 9")
            .seal(Some("boss"))
    }

    #[tokio::test]
    async fn granted_notification_is_shown() {
        let sink = Recorder::new(Permission::Granted, Behaviour::Ok);
        let notifier = Notifier::new(sink.clone(), Bus::new(8));

        notifier.evaluate(&notification()).unwrap().await.unwrap();
        let shown = sink.shown.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Manager");
    }

    #[tokio::test]
    async fn other_kinds_and_denied_permission_are_skipped() {
        let sink = Recorder::new(Permission::Granted, Behaviour::Ok);
        let notifier = Notifier::new(sink.clone(), Bus::new(8));
        let task = Draft::new(MessageKind::TaskUpdate).seal(None);
        assert!(notifier.evaluate(&task).is_none());

        let denied = Recorder::new(Permission::Denied, Behaviour::Ok);
        let notifier = Notifier::new(denied.clone(), Bus::new(8));
        assert!(notifier.evaluate(&notification()).is_none());
        assert!(denied.shown.lock().is_empty());
    }

    #[tokio::test]
    async fn prime_requests_only_when_undetermined() {
        let sink = Recorder::new(Permission::Undetermined, Behaviour::Ok);
        let notifier = Notifier::new(sink.clone(), Bus::new(8));
        assert_eq!(notifier.prime().await, Permission::Granted);
        assert_eq!(notifier.prime().await, Permission::Granted);
        assert_eq!(*sink.requests.lock(), 1);
    }

    #[tokio::test]
    async fn failures_and_panics_become_events() {
        for behaviour in [Behaviour::Fail, Behaviour::Panic] {
            let bus = Bus::new(8);
            let mut rx = bus.subscribe();
            let notifier = Notifier::new(Recorder::new(Permission::Granted, behaviour), bus);

            let msg = notification();
            notifier.evaluate(&msg).unwrap().await.unwrap();

            let ev = rx.recv().await.unwrap();
            assert_eq!(ev.kind, EventKind::AlertFailed);
            assert_eq!(ev.message_id.as_deref(), Some(msg.id.as_str()));
            assert!(ev.reason.is_some());
        }
    }

    #[tokio::test]
    async fn panicking_permission_check_reads_as_denied() {
        let sink = Recorder::new(Permission::Granted, Behaviour::PanicOnPermission);
        let notifier = Notifier::new(sink.clone(), Bus::new(8));

        assert_eq!(notifier.permission(), Permission::Denied);
        assert!(notifier.evaluate(&notification()).is_none());
        assert_eq!(notifier.prime().await, Permission::Denied);
        assert_eq!(*sink.requests.lock(), 0);
    }
}
