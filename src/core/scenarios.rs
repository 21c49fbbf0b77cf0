//! End-to-end session behaviour against the in-memory transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::alerts::{Alert, AlertSink, Permission};
use crate::core::{ConnectionState, Session, SessionConfig};
use crate::error::AlertError;
use crate::events::{Event, EventKind};
use crate::message::{Draft, Message, MessageKind};
use crate::subscribers::MatchKey;
use crate::transport::{MemoryPeer, MemoryServer, memory};

fn quiet_config() -> SessionConfig {
    let mut cfg = SessionConfig::default();
    cfg.endpoint = "ws://shifts.test/ws".into();
    cfg.heartbeat_interval = Duration::ZERO;
    cfg
}

fn start(cfg: SessionConfig) -> (Session, MemoryServer) {
    let (transport, server) = memory();
    let session = Session::builder(cfg)
        .with_transport(Arc::new(transport))
        .build()
        .expect("valid config");
    (session, server)
}

async fn within<F: Future>(fut: F) -> F::Output {
    time::timeout(Duration::from_secs(600), fut)
        .await
        .expect("scenario timed out")
}

async fn wait_state(session: &Session, state: ConnectionState) {
    let mut rx = session.watch_status();
    within(async {
        loop {
            if rx.borrow_and_update().state == state {
                return;
            }
            rx.changed().await.expect("driver alive");
        }
    })
    .await
}

async fn accept(server: &mut MemoryServer) -> MemoryPeer {
    within(server.accept()).await.expect("client dialed")
}

async fn next_event(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    within(async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(err) => panic!("event stream ended: {err}"),
            }
        }
    })
    .await
}

async fn connected(cfg: SessionConfig) -> (Session, MemoryServer, MemoryPeer) {
    let (session, mut server) = start(cfg);
    session.connect("u1").unwrap();
    let peer = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;
    (session, server, peer)
}

fn frame(kind: MessageKind, id: &str) -> Message {
    Draft::new(kind)
        .with_id(id)
        .with_field("title", format!("{kind} {id}"))
        .seal(Some("server"))
}

#[tokio::test(start_paused = true)]
async fn task_update_reaches_subscriber_and_history() {
    let (session, _server, peer) = connected(quiet_config()).await;
    assert_eq!(peer.endpoint(), "ws://shifts.test/ws/u1");

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.subscribe(MessageKind::TaskUpdate, move |m: &Message| {
        let _ = tx.send(m.clone());
    });

    peer.push_message(&frame(MessageKind::TaskUpdate, "t-1"));
    let got = within(rx.recv()).await.unwrap();
    assert_eq!(got.id, "t-1");
    assert_eq!(got.payload_str("title"), Some("task_update t-1"));
    assert_eq!(session.last_message().map(|m| m.id), Some("t-1".to_string()));
    assert_eq!(session.message_history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnects_with_growing_delay_and_resets() {
    let mut cfg = quiet_config();
    cfg.max_reconnect_attempts = 5;
    let (session, mut server, peer) = connected(cfg).await;
    let mut events = session.events();

    server.refuse_next(2);
    peer.hang_up();

    let mut delays = Vec::new();
    for _ in 0..3 {
        let ev = next_event(&mut events, EventKind::ReconnectScheduled).await;
        delays.push(ev.delay_ms.unwrap());
    }
    assert_eq!(delays, [1_000, 2_000, 4_000]);

    let _peer = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;
    assert_eq!(server.dials(), 4);

    let status = session.status();
    assert_eq!(status.attempt, 0);
    assert!(!status.reconnect_pending);
}

#[tokio::test(start_paused = true)]
async fn queued_messages_flush_in_order_on_connect() {
    let (session, mut server) = start(quiet_config());
    let ids: Vec<String> = (0..6)
        .map(|n| session.send_message(Draft::new(MessageKind::TaskUpdate).with_id(format!("m-{n}"))))
        .collect();

    let mut status = session.watch_status();
    within(status.wait_for(|s| s.queued == 6)).await.unwrap();
    assert!(!session.is_connected());

    session.connect("u1").unwrap();
    let mut peer = accept(&mut server).await;
    let mut wire = Vec::new();
    for _ in 0..6 {
        wire.push(within(peer.recv_message()).await.unwrap().unwrap().id);
    }
    assert_eq!(wire, ids);
    within(status.wait_for(|s| s.queued == 0 && s.state == ConnectionState::Connected))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn send_while_connected_goes_straight_out() {
    let (session, _server, mut peer) = connected(quiet_config()).await;
    let id = session.send_message(Draft::new(MessageKind::ReviewUpdate).with_field("score", 4));
    let got = within(peer.recv_message()).await.unwrap().unwrap();
    assert_eq!(got.id, id);
    assert_eq!(got.origin_user_id.as_deref(), Some("u1"));
    assert_eq!(session.status().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn wildcard_sees_everything_exact_sees_its_kind() {
    let (session, _server, peer) = connected(quiet_config()).await;
    let (all_tx, mut all_rx) = mpsc::unbounded_channel();
    let (review_tx, mut review_rx) = mpsc::unbounded_channel();
    session.subscribe(MatchKey::Any, move |m: &Message| {
        let _ = all_tx.send(m.id.clone());
    });
    session.subscribe(MessageKind::ReviewUpdate, move |m: &Message| {
        let _ = review_tx.send(m.id.clone());
    });

    peer.push_message(&frame(MessageKind::Notification, "n-1"));
    peer.push_message(&frame(MessageKind::ReviewUpdate, "r-1"));

    assert_eq!(within(all_rx.recv()).await.as_deref(), Some("n-1"));
    assert_eq!(within(all_rx.recv()).await.as_deref(), Some("r-1"));
    assert_eq!(within(review_rx.recv()).await.as_deref(), Some("r-1"));
    assert!(review_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn retry_after_exhaustion_connects_again() {
    let mut cfg = quiet_config();
    cfg.max_reconnect_attempts = 5;
    let (session, mut server) = start(cfg);
    let mut events = session.events();
    server.refuse_next(u32::MAX);

    session.connect("u1").unwrap();
    let exhausted = next_event(&mut events, EventKind::ReconnectExhausted).await;
    assert_eq!(exhausted.attempt, Some(5));
    assert_eq!(server.dials(), 6);

    let mut status = session.watch_status();
    let snapshot = within(status.wait_for(|s| s.state == ConnectionState::Disconnected))
        .await
        .unwrap()
        .clone();
    assert!(snapshot.is_quiescent());

    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(server.dials(), 6, "no automatic attempts after exhaustion");

    server.refuse_next(0);
    session.retry_connection();
    let _peer = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;
    assert_eq!(session.status().attempt, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_disconnect_closes_once_and_leaves_no_timers() {
    let mut cfg = quiet_config();
    cfg.heartbeat_interval = Duration::from_secs(30);
    let (session, server, mut peer) = connected(cfg).await;
    assert!(session.status().heartbeat_active);

    session.disconnect();
    session.disconnect();
    session.disconnect();

    assert!(within(peer.recv()).await.is_none(), "link closed");
    let mut status = session.watch_status();
    within(status.wait_for(|s| s.state == ConnectionState::Disconnected && s.is_quiescent()))
        .await
        .unwrap();
    assert_eq!(server.client_closes(), 1);

    time::sleep(Duration::from_secs(300)).await;
    assert_eq!(server.dials(), 1);
    assert!(session.status().is_quiescent());
}

#[tokio::test(start_paused = true)]
async fn connect_while_connected_is_a_no_op() {
    let (session, server, _peer) = connected(quiet_config()).await;
    session.connect("u1").unwrap();
    session.connect("u1").unwrap();
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(server.dials(), 1);
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped() {
    let (session, _server, peer) = connected(quiet_config()).await;
    let mut events = session.events();
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.subscribe(MatchKey::Any, move |m: &Message| {
        let _ = tx.send(m.id.clone());
    });

    peer.push("not json at all");
    peer.push(r#"{"type":"shift_swap","payload":{}}"#);
    peer.push_message(&frame(MessageKind::WorkflowUpdate, "w-1"));

    next_event(&mut events, EventKind::FrameDropped).await;
    next_event(&mut events, EventKind::FrameDropped).await;
    assert_eq!(within(rx.recv()).await.as_deref(), Some("w-1"));
    assert_eq!(session.message_history().len(), 1);
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn heartbeats_go_out_and_stay_out_of_history() {
    let mut cfg = quiet_config();
    cfg.heartbeat_interval = Duration::from_secs(30);
    let (session, _server, mut peer) = connected(cfg).await;
    let mut events = session.events();

    let beat = within(peer.recv_message()).await.unwrap().unwrap();
    assert_eq!(beat.kind, MessageKind::Heartbeat);
    assert_eq!(beat.origin_user_id.as_deref(), Some("u1"));

    peer.push_message(&Draft::new(MessageKind::Heartbeat).seal(Some("server")));
    next_event(&mut events, EventKind::HeartbeatReceived).await;

    let mut status = session.watch_status();
    within(status.wait_for(|s| s.last_heartbeat.is_some())).await.unwrap();
    assert!(session.message_history().is_empty());
    assert!(session.last_message().is_none());
}

#[tokio::test(start_paused = true)]
async fn silent_server_trips_liveness_window() {
    let mut cfg = quiet_config();
    cfg.heartbeat_interval = Duration::from_secs(10);
    cfg.liveness_window = Duration::from_secs(15);
    let (session, mut server, mut peer) = connected(cfg).await;
    let mut events = session.events();

    let beat = within(peer.recv_message()).await.unwrap().unwrap();
    assert!(beat.is_heartbeat());

    let lost = next_event(&mut events, EventKind::LivenessLost).await;
    assert_eq!(lost.delay_ms, Some(15_000));
    assert!(within(peer.recv()).await.is_none());
    assert_eq!(server.client_closes(), 1);

    let _again = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_does_not_stop_others() {
    let (session, _server, peer) = connected(quiet_config()).await;
    let mut events = session.events();
    session.subscribe(MatchKey::Any, |_m: &Message| panic!("bad consumer"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.subscribe(MatchKey::Any, move |m: &Message| {
        let _ = tx.send(m.id.clone());
    });

    peer.push_message(&frame(MessageKind::SystemAnnouncement, "s-1"));
    assert_eq!(within(rx.recv()).await.as_deref(), Some("s-1"));
    let ev = next_event(&mut events, EventKind::SubscriberPanicked).await;
    assert_eq!(ev.reason.as_deref(), Some("bad consumer"));
}

struct ChannelAlerts(mpsc::UnboundedSender<Alert>);

#[async_trait]
impl AlertSink for ChannelAlerts {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        let _ = self.0.send(alert.clone());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn notifications_raise_platform_alerts() {
    let (alerts_tx, mut alerts_rx) = mpsc::unbounded_channel();
    let (transport, mut server) = memory();
    let session = Session::builder(quiet_config())
        .with_transport(Arc::new(transport))
        .with_alerts(Arc::new(ChannelAlerts(alerts_tx)))
        .build()
        .unwrap();
    session.connect("u1").unwrap();
    let peer = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;

    peer.push_message(&frame(MessageKind::TaskUpdate, "t-9"));
    peer.push_message(&frame(MessageKind::Notification, "n-9"));

    let alert = within(alerts_rx.recv()).await.unwrap();
    assert_eq!(alert.message_id, "n-9");
    assert_eq!(alert.title, "notification n-9");
}

#[tokio::test(start_paused = true)]
async fn shutdown_tears_everything_down() {
    let (session, server, mut peer) = connected(quiet_config()).await;
    let mut events = session.events();
    let subscription = session.subscribe(MatchKey::Any, |_m: &Message| {});

    session.shutdown().await;
    assert!(within(peer.recv()).await.is_none());
    assert_eq!(server.client_closes(), 1);
    assert_eq!(session.connection_status(), ConnectionState::Disconnected);
    next_event(&mut events, EventKind::SessionClosed).await;

    session.send_message(Draft::new(MessageKind::TaskUpdate));
    session.disconnect();
    drop(session);
    assert!(!subscription.unsubscribe(), "registry is gone");
}

#[tokio::test(start_paused = true)]
async fn rejects_empty_identity() {
    let (session, server) = start(quiet_config());
    assert!(session.connect("   ").is_err());
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(server.dials(), 0);
}

struct BrokenPermission;

#[async_trait]
impl AlertSink for BrokenPermission {
    fn permission(&self) -> Permission {
        panic!("permission store unavailable")
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn notify(&self, _alert: &Alert) -> Result<(), AlertError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn broken_permission_check_does_not_stop_delivery() {
    let (transport, mut server) = memory();
    let session = Session::builder(quiet_config())
        .with_transport(Arc::new(transport))
        .with_alerts(Arc::new(BrokenPermission))
        .build()
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.subscribe(MatchKey::Any, move |m: &Message| {
        let _ = tx.send(m.id.clone());
    });
    session.connect("u1").unwrap();
    let peer = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;

    peer.push_message(&frame(MessageKind::Notification, "n-1"));
    peer.push_message(&frame(MessageKind::TaskUpdate, "t-2"));

    assert_eq!(within(rx.recv()).await.as_deref(), Some("n-1"));
    assert_eq!(within(rx.recv()).await.as_deref(), Some("t-2"));
    assert_eq!(session.message_history().len(), 2);
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn undecodable_binary_frame_keeps_the_link() {
    let (session, server, peer) = connected(quiet_config()).await;
    let mut events = session.events();
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.subscribe(MessageKind::TaskUpdate, move |m: &Message| {
        let _ = tx.send(m.id.clone());
    });

    peer.push_bytes(vec![0xff, 0xfe]);
    peer.push_message(&frame(MessageKind::TaskUpdate, "t-1"));

    let dropped = next_event(&mut events, EventKind::FrameDropped).await;
    assert!(dropped.reason.is_some());
    assert_eq!(within(rx.recv()).await.as_deref(), Some("t-1"));
    assert!(session.is_connected());
    assert_eq!(server.dials(), 1);
}

#[tokio::test(start_paused = true)]
async fn ignored_connect_keeps_the_current_identity() {
    let (session, mut server, mut peer) = connected(quiet_config()).await;

    session.connect("u2").unwrap();
    let id = session.send_message(Draft::new(MessageKind::TaskUpdate));
    let got = within(peer.recv_message()).await.unwrap().unwrap();
    assert_eq!(got.id, id);
    assert_eq!(got.origin_user_id.as_deref(), Some("u1"));
    assert_eq!(session.status().identity.as_deref(), Some("u1"));

    peer.hang_up();
    let again = accept(&mut server).await;
    assert_eq!(again.endpoint(), "ws://shifts.test/ws/u1");
    assert_eq!(server.dials(), 2);
}

#[tokio::test(start_paused = true)]
async fn messages_queued_before_connect_carry_the_connecting_identity() {
    let (session, mut server) = start(quiet_config());
    session.send_message(Draft::new(MessageKind::TaskUpdate).with_id("early"));
    session.connect("u7").unwrap();

    let mut peer = accept(&mut server).await;
    let got = within(peer.recv_message()).await.unwrap().unwrap();
    assert_eq!(got.id, "early");
    assert_eq!(got.origin_user_id.as_deref(), Some("u7"));
}

#[tokio::test(start_paused = true)]
async fn transport_error_then_close_schedules_one_reconnect() {
    let (session, mut server, peer) = connected(quiet_config()).await;
    let mut events = session.events();

    peer.fault("connection reset");
    let error = next_event(&mut events, EventKind::StateChanged).await;
    assert_eq!(error.to, Some(ConnectionState::Error));

    let _again = accept(&mut server).await;
    wait_state(&session, ConnectionState::Connected).await;
    assert_eq!(server.dials(), 2);

    let mut scheduled = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::ReconnectScheduled {
            scheduled += 1;
        }
    }
    assert_eq!(scheduled, 1);
}

#[tokio::test(start_paused = true)]
async fn in_flight_messages_survive_a_dropped_link() {
    let (session, mut server, peer) = connected(quiet_config()).await;

    let mut sent = vec![
        session.send_message(Draft::new(MessageKind::TaskUpdate).with_id("a")),
        session.send_message(Draft::new(MessageKind::TaskUpdate).with_id("b")),
    ];
    peer.hang_up();
    sent.push(session.send_message(Draft::new(MessageKind::TaskUpdate).with_id("c")));

    wait_state(&session, ConnectionState::Disconnected).await;
    sent.push(session.send_message(Draft::new(MessageKind::TaskUpdate).with_id("d")));

    let mut again = accept(&mut server).await;
    let mut wire = Vec::new();
    for _ in 0..4 {
        wire.push(within(again.recv_message()).await.unwrap().unwrap().id);
    }
    assert_eq!(wire, sent);
    assert!(
        time::timeout(Duration::from_secs(5), again.recv()).await.is_err(),
        "nothing is sent twice"
    );
    assert_eq!(session.status().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_link_walks_through_reconnect_states() {
    let (session, mut server, peer) = connected(quiet_config()).await;
    let mut events = session.events();

    peer.hang_up();
    let _again = accept(&mut server).await;

    let mut path = Vec::new();
    loop {
        let ev = next_event(&mut events, EventKind::StateChanged).await;
        let to = ev.to.expect("state change carries a target");
        path.push(to);
        if to == ConnectionState::Connected {
            break;
        }
    }
    assert_eq!(
        path,
        [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
}
