//! # Session driver: the single owner of connection state.
//!
//! Every session runs exactly one driver task. Handles talk to it through
//! [`Command`]s; link pumps and timers talk to it through [`Input`]s. Nothing
//! else mutates the connection state, the reconnect policy or the outbound queue.
//!
//! ## Architecture
//! ```text
//! Session ──Command──►┐
//!                     │        ┌──────────── Driver::run ────────────┐
//! LinkPump ──Input───►├──────► │ select! { commands, inputs }        │
//! Heartbeat ─Input───►│        │   on_command / on_input             │
//! Timer ─────Input───►┘        │   next_state(state, trigger)        │
//!                              │   publish status + events           │
//!                              └─────────────────────────────────────┘
//! ```
//!
//! ## Connection lifecycle
//! ```text
//! connect ─► Connecting ─► spawn pump(gen)
//! Opened  ─► Connected  ─► reset policy, start heartbeat, flush outbox
//! Failed  ─► Error      (no reconnect yet)
//! Closed  ─► Disconnected, stop heartbeat, requeue undelivered
//!              ├─ auto-reconnect on && attempts left ─► arm timer(current_delay)
//!              └─ otherwise                           ─► ReconnectExhausted (terminal)
//! ```
//!
//! ## Rules
//! - Link events from a superseded generation are ignored, except that their
//!   undelivered messages go back to the front of the outbound queue.
//! - An explicit `disconnect` disables auto-reconnect until the next `connect`/`retry`.
//! - The driver cancels a link at most once: it gives up the handle when it does.
//! - The identity changes only when a `connect` actually opens a link; a
//!   `connect` that is ignored leaves the current identity in place.
//! - Outbound messages are stamped with the identity of the link that first
//!   carries them; requeued messages keep their stamp.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::alerts::Notifier;
use crate::buffers::{Enqueued, OutboundQueue};
use crate::core::heartbeat::Heartbeat;
use crate::core::link::{self, LinkEvent, LinkHandle};
use crate::core::machine::{ConnectionState, Trigger, next_state};
use crate::core::shared::{Shared, StatusSnapshot};
use crate::core::timer::ReconnectTimer;
use crate::core::SessionConfig;
use crate::events::{Bus, Event, EventKind};
use crate::message::{Draft, Message, MessageKind};
use crate::policies::{OverflowPolicy, ReconnectPolicy};
use crate::transport::{Frame, Transport};

/// Requests from session handles.
pub(crate) enum Command {
    Connect { identity: String },
    Disconnect,
    Retry,
    Send(Message),
    Shutdown { ack: oneshot::Sender<()> },
}

/// Notifications from tasks owned by the driver.
pub(crate) enum Input {
    Link { generation: u64, event: LinkEvent },
    HeartbeatTick { run: u64 },
    ReconnectDue { ticket: u64 },
}

pub(crate) struct Driver {
    cfg: SessionConfig,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    bus: Bus,
    notifier: Notifier,
    inputs: mpsc::UnboundedSender<Input>,

    state: ConnectionState,
    policy: ReconnectPolicy,
    outbox: OutboundQueue,
    heartbeat: Heartbeat,
    reconnect: ReconnectTimer,
    link: Option<LinkHandle>,
    /// Cancelled links whose pump has not reported `Closed` yet.
    retired: Vec<LinkHandle>,
    next_generation: u64,

    identity: Option<String>,
    auto_reconnect: bool,
    last_inbound: Option<Instant>,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl Driver {
    pub(crate) fn new(
        cfg: SessionConfig,
        transport: Arc<dyn Transport>,
        shared: Arc<Shared>,
        bus: Bus,
        notifier: Notifier,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            policy: ReconnectPolicy::new(cfg.reconnect, cfg.max_reconnect_attempts),
            outbox: OutboundQueue::new(cfg.outbound_limit(), cfg.overflow),
            heartbeat: Heartbeat::new(cfg.heartbeat_period()),
            reconnect: ReconnectTimer::default(),
            cfg,
            transport,
            shared,
            bus,
            notifier,
            inputs,
            state: ConnectionState::Disconnected,
            link: None,
            retired: Vec::new(),
            next_generation: 0,
            identity: None,
            auto_reconnect: true,
            last_inbound: None,
            last_heartbeat: None,
        }
    }

    /// Runs until shutdown is requested or every handle is dropped.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inputs: mpsc::UnboundedReceiver<Input>,
    ) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.prime().await;
        });

        let mut ack = None;
        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => match cmd {
                    Some(Command::Shutdown { ack: done }) => {
                        ack = Some(done);
                        break;
                    }
                    Some(cmd) => self.on_command(cmd),
                    None => break,
                },
                Some(input) = inputs.recv() => self.on_input(input),
            }
            self.publish_status();
        }

        self.teardown().await;
        if let Some(done) = ack {
            let _ = done.send(());
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { identity } => {
                if self.state.is_active() {
                    tracing::debug!(
                        target: "shiftlink::session",
                        state = %self.state,
                        "connect ignored; already active"
                    );
                    return;
                }
                self.identity = Some(identity);
                self.auto_reconnect = true;
                self.open();
            }
            Command::Retry => {
                self.policy.reset();
                self.auto_reconnect = true;
                tracing::info!(target: "shiftlink::session", "manual retry requested");
                self.connect();
            }
            Command::Disconnect => self.disconnect(),
            Command::Send(message) => self.send(message),
            Command::Shutdown { .. } => {}
        }
    }

    fn on_input(&mut self, input: Input) {
        match input {
            Input::Link { generation, event } => self.on_link(generation, event),
            Input::HeartbeatTick { run } => self.on_heartbeat_tick(run),
            Input::ReconnectDue { ticket } => {
                if !self.reconnect.fire(ticket) {
                    return;
                }
                if self.auto_reconnect && !self.state.is_active() {
                    tracing::debug!(
                        target: "shiftlink::session",
                        attempt = self.policy.attempt(),
                        "reconnect timer fired"
                    );
                    self.open();
                }
            }
        }
    }

    // ---- commands ----

    fn connect(&mut self) {
        if self.state.is_active() {
            tracing::debug!(target: "shiftlink::session", state = %self.state, "connect ignored; already active");
            return;
        }
        self.open();
    }

    fn disconnect(&mut self) {
        self.auto_reconnect = false;
        self.reconnect.cancel();
        if let Some(link) = self.link.take() {
            link.cancel();
            self.retired.push(link);
        }
        self.transition(Trigger::Disconnect, None);
    }

    fn send(&mut self, mut message: Message) {
        if self.state == ConnectionState::Connected {
            stamp_origin(&mut message, self.identity.as_deref());
            self.flush();
            if self.outbox.is_empty() {
                if let Some(link) = &self.link {
                    if let Err(unsent) = link.write(message) {
                        self.enqueue(unsent);
                    }
                    return;
                }
            }
        }
        self.enqueue(message);
    }

    // ---- link ----

    fn open(&mut self) {
        let Some(identity) = self.identity.clone() else {
            tracing::warn!(target: "shiftlink::session", "connect requested before any identity was given");
            return;
        };
        let endpoint = match self.cfg.endpoint_for(&identity) {
            Ok(url) => url.to_string(),
            Err(err) => {
                tracing::warn!(target: "shiftlink::session", error = %err, label = err.as_label(), "cannot build endpoint");
                return;
            }
        };

        self.reconnect.cancel();
        if let Some(old) = self.link.take() {
            old.cancel();
            self.retired.push(old);
        }
        if self.transition(Trigger::Connect, None).is_none() {
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        tracing::info!(
            target: "shiftlink::session",
            %endpoint,
            generation,
            attempt = self.policy.attempt(),
            "opening link"
        );
        self.link = Some(link::spawn(
            Arc::clone(&self.transport),
            endpoint,
            generation,
            self.inputs.clone(),
        ));
    }

    fn on_link(&mut self, generation: u64, event: LinkEvent) {
        let current = self.link.as_ref().map(|l| l.generation) == Some(generation);
        if !current {
            if let LinkEvent::Closed { undelivered } = event {
                self.retired.retain(|l| l.generation != generation);
                self.requeue(undelivered);
            }
            return;
        }

        match event {
            LinkEvent::Opened => {
                if self.transition(Trigger::Opened, None).is_some() {
                    self.policy.reset();
                    self.last_inbound = Some(Instant::now());
                    self.flush();
                }
            }
            LinkEvent::Frame(frame) => self.on_frame(&frame),
            LinkEvent::Failed(err) => {
                tracing::warn!(
                    target: "shiftlink::session",
                    generation,
                    error = %err,
                    label = err.as_label(),
                    "transport error"
                );
                self.transition(Trigger::TransportError, Some(err.to_string()));
            }
            LinkEvent::Closed { undelivered } => {
                self.link = None;
                self.requeue(undelivered);
                self.transition(Trigger::Closed, None);
                self.schedule_reconnect();
            }
        }
    }

    fn on_frame(&mut self, frame: &Frame) {
        self.last_inbound = Some(Instant::now());

        let message = match frame.decode() {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(
                    target: "shiftlink::session",
                    error = %err,
                    label = err.as_label(),
                    len = frame.len(),
                    "dropping malformed frame"
                );
                self.bus
                    .publish(Event::new(EventKind::FrameDropped).with_reason(err.to_string()));
                return;
            }
        };

        if message.is_heartbeat() {
            tracing::trace!(target: "shiftlink::session", message_id = %message.id, "heartbeat received");
            self.last_heartbeat = Some(Utc::now());
            self.bus
                .publish(Event::new(EventKind::HeartbeatReceived).with_message(message.id.as_str()));
            return;
        }

        self.shared.history.lock().push(message.clone());

        let report = self.shared.registry.dispatch(&message);
        for (_, info) in report.panicked {
            self.bus
                .publish(Event::subscriber_panicked(&message.id, info));
        }
        tracing::debug!(
            target: "shiftlink::session",
            kind = %message.kind,
            message_id = %message.id,
            delivered = report.delivered,
            "message dispatched"
        );

        self.notifier.evaluate(&message);
    }

    fn on_heartbeat_tick(&mut self, run: u64) {
        if !self.heartbeat.accepts(run) || self.state != ConnectionState::Connected {
            return;
        }

        if let (Some(window), Some(last)) = (self.cfg.liveness_limit(), self.last_inbound) {
            if last.elapsed() > window {
                tracing::warn!(
                    target: "shiftlink::session",
                    window_ms = window.as_millis() as u64,
                    "no inbound traffic within liveness window; closing link"
                );
                self.bus
                    .publish(Event::new(EventKind::LivenessLost).with_delay(window));
                self.heartbeat.stop();
                if let Some(link) = &self.link {
                    link.cancel();
                }
                return;
            }
        }

        let heartbeat = Draft::new(MessageKind::Heartbeat).seal(self.identity.as_deref());
        let id = heartbeat.id.clone();
        if let Some(link) = &self.link {
            if link.write(heartbeat).is_ok() {
                tracing::trace!(target: "shiftlink::session", message_id = %id, "heartbeat sent");
                self.bus
                    .publish(Event::new(EventKind::HeartbeatSent).with_message(id));
            }
        }
    }

    // ---- outbound ----

    fn enqueue(&mut self, message: Message) {
        let id = message.id.clone();
        match self.outbox.enqueue(message) {
            Enqueued::Accepted => {
                tracing::debug!(target: "shiftlink::session", message_id = %id, queued = self.outbox.len(), "message queued");
                self.bus
                    .publish(Event::new(EventKind::OutboundQueued).with_message(id));
            }
            Enqueued::Evicted(old) => {
                self.bus
                    .publish(Event::new(EventKind::OutboundQueued).with_message(id));
                self.overflowed(&old, OverflowPolicy::DropOldest);
            }
            Enqueued::Rejected(new) => self.overflowed(&new, OverflowPolicy::RejectNew),
        }
    }

    fn requeue(&mut self, undelivered: Vec<Message>) {
        if undelivered.is_empty() {
            return;
        }
        tracing::debug!(target: "shiftlink::session", count = undelivered.len(), "requeueing undelivered messages");
        for lost in self.outbox.requeue_front(undelivered) {
            self.overflowed(&lost, OverflowPolicy::DropOldest);
        }
        if self.state == ConnectionState::Connected {
            self.flush();
        }
    }

    fn overflowed(&self, lost: &Message, policy: OverflowPolicy) {
        tracing::warn!(
            target: "shiftlink::session",
            message_id = %lost.id,
            policy = policy.as_label(),
            limit = ?self.outbox.limit(),
            "outbound queue full; message lost"
        );
        self.bus.publish(
            Event::new(EventKind::OutboundOverflow)
                .with_message(lost.id.as_str())
                .with_reason(policy.as_label()),
        );
    }

    fn flush(&mut self) {
        let Some(link) = &self.link else {
            return;
        };
        if self.outbox.is_empty() {
            return;
        }
        let identity = self.identity.as_deref();
        let drained = self.outbox.drain_into(|mut m| {
            stamp_origin(&mut m, identity);
            link.write(m)
        });
        if drained.sent > 0 {
            tracing::debug!(target: "shiftlink::session", sent = drained.sent, "outbound queue flushed");
            self.bus.publish(
                Event::new(EventKind::OutboundFlushed)
                    .with_attempt(u32::try_from(drained.sent).unwrap_or(u32::MAX)),
            );
        }
    }

    // ---- state ----

    /// Applies `trigger`; returns the new state if it applied.
    fn transition(&mut self, trigger: Trigger, reason: Option<String>) -> Option<ConnectionState> {
        let from = self.state;
        let to = next_state(from, trigger)?;
        if to == from {
            return Some(to);
        }
        self.state = to;

        if from == ConnectionState::Connected {
            self.heartbeat.stop();
        }
        if to == ConnectionState::Connected {
            self.heartbeat.start(&self.inputs);
        }

        tracing::info!(target: "shiftlink::session", %from, %to, ?trigger, "connection state changed");
        let mut ev = Event::state_changed(from, to);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
        Some(to)
    }

    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect {
            return;
        }
        match self.policy.advance() {
            Some(delay) => {
                let attempt = self.policy.attempt();
                tracing::warn!(
                    target: "shiftlink::session",
                    attempt,
                    max = self.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "connection lost; reconnect scheduled"
                );
                self.reconnect.arm(delay, &self.inputs);
                self.bus.publish(
                    Event::new(EventKind::ReconnectScheduled)
                        .with_attempt(attempt)
                        .with_delay(delay),
                );
            }
            None => {
                let attempts = self.policy.attempt();
                tracing::warn!(
                    target: "shiftlink::session",
                    attempts,
                    "reconnect attempts exhausted; waiting for retry_connection"
                );
                self.bus
                    .publish(Event::new(EventKind::ReconnectExhausted).with_attempt(attempts));
            }
        }
    }

    fn publish_status(&self) {
        self.shared.publish_status(StatusSnapshot {
            state: self.state,
            attempt: self.policy.attempt(),
            next_delay: self.reconnect.delay(),
            queued: self.outbox.len(),
            heartbeat_active: self.heartbeat.is_running(),
            reconnect_pending: self.reconnect.is_pending(),
            last_heartbeat: self.last_heartbeat,
            identity: self.identity.clone(),
        });
    }

    async fn teardown(&mut self) {
        self.auto_reconnect = false;
        self.reconnect.cancel();
        self.heartbeat.stop();
        let link = self.link.take();
        self.transition(Trigger::Disconnect, None);
        self.publish_status();

        if let Some(link) = link {
            link.shutdown().await;
        }
        for old in self.retired.drain(..) {
            old.shutdown().await;
        }
        tracing::info!(target: "shiftlink::session", "session closed");
        self.bus.publish(Event::new(EventKind::SessionClosed));
    }
}

fn stamp_origin(message: &mut Message, identity: Option<&str>) {
    if message.origin_user_id.is_none() {
        message.origin_user_id = identity.map(str::to_owned);
    }
}
