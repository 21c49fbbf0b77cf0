//! # Example: session
//!
//! Runs a session against the in-memory server and walks through the
//! connection lifecycle: queued sends, flush on connect, dispatch, a dropped
//! link, one refused reconnect and the recovery.
//!
//! ## Flow
//! ```text
//! send_message x2 ─► queued (Disconnected)
//! connect("manager-7") ─► Connecting ─► Connected ─► queue flushed in order
//! server pushes task_update ─► subscriber
//! server hangs up ─► Disconnected ─► ReconnectScheduled(250ms)
//!   └─► dial refused ─► Error ─► Disconnected ─► ReconnectScheduled(500ms)
//!         └─► dial accepted ─► Connected (attempt counter reset)
//! shutdown()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=shiftlink=debug cargo run --example session
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use shiftlink::{
    BackoffPolicy, ConnectionState, Draft, EventKind, MatchKey, Message, MessageKind, Session,
    SessionConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = SessionConfig::default();
    cfg.endpoint = "ws://demo.local/ws".into();
    cfg.reconnect = BackoffPolicy {
        base: Duration::from_millis(250),
        max: Duration::from_secs(2),
        ..BackoffPolicy::default()
    };
    cfg.heartbeat_interval = Duration::from_secs(1);

    let (transport, mut server) = shiftlink::transport::memory();
    let session = Session::builder(cfg)
        .with_transport(Arc::new(transport))
        .build()?;

    let mut events = session.events();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::StateChanged => println!(
                    "[event #{}] {:?} -> {:?}",
                    ev.seq, ev.from, ev.to
                ),
                EventKind::ReconnectScheduled => println!(
                    "[event #{}] reconnect #{} in {}ms",
                    ev.seq,
                    ev.attempt.unwrap_or_default(),
                    ev.delay_ms.unwrap_or_default()
                ),
                kind => println!("[event #{}] {}", ev.seq, kind.as_label()),
            }
        }
    });

    let tasks = session.subscribe(MessageKind::TaskUpdate, |m: &Message| {
        println!("[tasks] {} -> {:?}", m.id, m.payload_str("title"));
    });
    let _audit = session.subscribe(MatchKey::Any, |m: &Message| {
        println!("[audit] {} {}", m.kind, m.id);
    });

    session.send_message(Draft::new(MessageKind::TaskUpdate).with_field("title", "Restock fries"));
    session.send_message(Draft::new(MessageKind::ReviewUpdate).with_field("score", 5));
    session.connect("manager-7")?;

    let mut peer = server.accept().await.context("client never dialed")?;
    println!("[server] accepted {}", peer.endpoint());
    for _ in 0..2 {
        let msg = peer.recv_message().await.context("link closed")??;
        println!("[server] got {} from {:?}", msg.kind, msg.origin_user_id);
    }

    peer.push_message(
        &Draft::new(MessageKind::TaskUpdate)
            .with_field("title", "Wipe counters")
            .seal(Some("shift-lead")),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.refuse_next(1);
    peer.hang_up();

    let _peer = server.accept().await.context("no reconnect")?;
    let mut status = session.watch_status();
    status
        .wait_for(|s| s.state == ConnectionState::Connected)
        .await?;
    println!("[client] reconnected after {} dials", server.dials());

    tasks.unsubscribe();
    session.shutdown().await;
    println!("[client] history: {} message(s)", session.message_history().len());
    Ok(())
}
