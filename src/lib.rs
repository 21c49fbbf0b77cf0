//! # shiftlink
//!
//! **Shiftlink** is the real-time event client behind shift checklists,
//! manager announcements and task hand-offs.
//!
//! A [`Session`] keeps one persistent connection to the event server alive
//! across failures: it reconnects with backoff, sends periodic heartbeats,
//! buffers outbound messages while the link is down and fans inbound messages
//! out to local subscribers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────┐  connect / send_message / disconnect / retry_connection
//!   │  Session   │─────────────────────────────────────┐
//!   │ (handles)  │◄── status / history / events ──┐    │ Command
//!   └─────┬──────┘                                │    ▼
//!         │ subscribe                    ┌────────┴──────────────────────────────┐
//!         ▼                              │  Driver (one task per session)        │
//! ┌────────────────────┐   dispatch      │  - ConnectionState (next_state)       │
//! │ SubscriberRegistry │◄────────────────│  - ReconnectPolicy / ReconnectTimer   │
//! │ exact[kind] + any  │                 │  - OutboundQueue                      │
//! └────────────────────┘                 │  - Heartbeat                          │
//!                                        │  - HistoryBuffer (shared)             │
//! ┌────────────────────┐   evaluate      └───┬───────────────▲───────────────┬───┘
//! │ Notifier/AlertSink │◄────────────────────┘               │ Input         │ publish
//! └────────────────────┘                          ┌──────────┴─────────┐     ▼
//!                                                 │ link pump (per gen)│   Bus ──► events()
//!                                                 │  Transport + Link  │
//!                                                 └──────────┬─────────┘
//!                                                            ▼
//!                                                  WebSocket / in-memory
//! ```
//!
//! ### Lifecycle
//! ```text
//! connect(identity)
//!   └─► Connecting ─► link pump dials endpoint/<identity>
//!         ├─ Opened ─► Connected: reset backoff, start heartbeat, flush queue
//!         │     ├─ frame ─► decode ─► heartbeat? note it : history + dispatch + alert
//!         │     └─ error ─► Error
//!         └─ Closed ─► Disconnected, stop heartbeat
//!               ├─ attempts left && not disconnected by caller ─► wait current_delay, dial again
//!               └─ otherwise ─► stay Disconnected until retry_connection()
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                           |
//! |-------------------|----------------------------------------------------------|----------------------------------------------|
//! | **Session**       | Connection lifecycle, sending, observables.              | [`Session`], [`SessionBuilder`]              |
//! | **Messages**      | Wire model and outbound drafts.                          | [`Message`], [`MessageKind`], [`Draft`]      |
//! | **Subscribers**   | Per-kind and wildcard callbacks with panic isolation.    | [`SubscriberRegistry`], [`Subscription`]     |
//! | **Policies**      | Reconnect backoff and outbound overflow.                 | [`BackoffPolicy`], [`OverflowPolicy`]        |
//! | **Events**        | Lifecycle event stream.                                  | [`Event`], [`EventKind`]                     |
//! | **Alerts**        | Platform notifications for `notification` messages.      | [`AlertSink`], [`Permission`]                |
//! | **Transport**     | Pluggable link; WebSocket and in-memory provided.        | [`Transport`], [`Link`]                      |
//! | **Configuration** | All session settings in one place.                       | [`SessionConfig`]                            |
//!
//! ## Optional features
//! - `websocket` _(default)_: [`WsTransport`] over `tokio-tungstenite`.
//! - `websocket-tls`: `wss://` endpoints with webpki roots.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use shiftlink::{Draft, Message, MessageKind, Session, SessionConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (transport, mut server) = shiftlink::transport::memory();
//!     let session = Session::builder(SessionConfig::default())
//!         .with_transport(Arc::new(transport))
//!         .build()?;
//!
//!     let tasks = session.subscribe(MessageKind::TaskUpdate, |m: &Message| {
//!         println!("task update {}", m.id);
//!     });
//!
//!     // Queued until the link is up, then flushed in order.
//!     session.send_message(Draft::new(MessageKind::TaskUpdate).with_field("done", true));
//!     session.connect("user-42")?;
//!
//!     let mut peer = server.accept().await.expect("dialed");
//!     let sent = peer.recv_message().await.expect("flushed")?;
//!     assert_eq!(sent.origin_user_id.as_deref(), Some("user-42"));
//!
//!     tasks.unsubscribe();
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

mod alerts;
mod buffers;
mod core;
mod error;
mod events;
mod message;
mod policies;
mod subscribers;
pub mod transport;

// ---- Public re-exports ----

pub use alerts::{Alert, AlertSink, NoopAlerts, Notifier, Permission};
pub use buffers::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_OUTBOUND_CAPACITY, Drained, Enqueued, HistoryBuffer,
    OutboundQueue,
};
pub use self::core::{
    ConnectionState, Session, SessionBuilder, SessionConfig, StatusSnapshot, Trigger, next_state,
};
pub use error::{AlertError, ConfigError, FrameError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use message::{Draft, Message, MessageKind, Payload};
pub use policies::{BackoffPolicy, JitterPolicy, OverflowPolicy, ReconnectPolicy};
pub use subscribers::{Callback, DispatchReport, MatchKey, SubscriberRegistry, Subscription};
pub use transport::{Frame, Link, Transport};
#[cfg(feature = "websocket")]
pub use transport::WsTransport;
