//! # Link pump: one task per connection attempt.
//!
//! The pump owns the transport link. It reports everything that happens to
//! the driver as [`LinkEvent`]s tagged with its generation and writes the
//! messages the driver hands it.
//!
//! ```text
//! spawn(generation)
//!   ├─► connect(endpoint)   (cancellable)
//!   │     ├─ Err ─► Failed(e) ─► Closed { undelivered }
//!   │     └─ Ok  ─► Opened
//!   └─► loop select! {
//!         cancel          ─► close() once ─► break
//!         writer.recv()   ─► encode + send  (failure ─► Failed, message kept)
//!         link.recv()     ─► Frame | Failed | (None: peer closed)
//!       }
//!       ─► Closed { undelivered }   always last
//! ```
//!
//! ## Rules
//! - `Closed` is the final event of every pump, whatever the exit path.
//! - `undelivered` holds every non-heartbeat message handed to the pump but not
//!   written, in the order they were handed over.
//! - The link is closed by the pump only on cancellation, so the number of
//!   graceful closes equals the number of cancelled open links.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::driver::Input;
use crate::error::TransportError;
use crate::message::Message;
use crate::transport::{Frame, Link, Transport};

/// Upper bound for a graceful close.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// What a pump reports to the driver.
#[derive(Debug)]
pub(crate) enum LinkEvent {
    Opened,
    Frame(Frame),
    Failed(TransportError),
    Closed { undelivered: Vec<Message> },
}

/// Driver-side handle of a running pump.
pub(crate) struct LinkHandle {
    pub(crate) generation: u64,
    cancel: CancellationToken,
    writer: mpsc::UnboundedSender<Message>,
    join: JoinHandle<()>,
}

impl LinkHandle {
    /// Hands `message` to the pump, or returns it if the pump is gone.
    pub(crate) fn write(&self, message: Message) -> Result<(), Message> {
        self.writer.send(message).map_err(|e| e.0)
    }

    /// Asks the pump to close the link and exit.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels the pump and waits (bounded) for it to finish closing.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        let _ = time::timeout(CLOSE_GRACE * 2, self.join).await;
    }
}

/// Spawns a pump dialing `endpoint`.
pub(crate) fn spawn(
    transport: Arc<dyn Transport>,
    endpoint: String,
    generation: u64,
    inputs: mpsc::UnboundedSender<Input>,
) -> LinkHandle {
    let cancel = CancellationToken::new();
    let (writer, rx) = mpsc::unbounded_channel();
    let pump = Pump {
        generation,
        inputs,
        cancel: cancel.clone(),
    };
    let join = tokio::spawn(pump.run(transport, endpoint, rx));
    LinkHandle {
        generation,
        cancel,
        writer,
        join,
    }
}

struct Pump {
    generation: u64,
    inputs: mpsc::UnboundedSender<Input>,
    cancel: CancellationToken,
}

impl Pump {
    fn emit(&self, event: LinkEvent) {
        let _ = self.inputs.send(Input::Link {
            generation: self.generation,
            event,
        });
    }

    async fn run(
        self,
        transport: Arc<dyn Transport>,
        endpoint: String,
        mut rx: mpsc::UnboundedReceiver<Message>,
    ) {
        let dialed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            res = transport.connect(&endpoint) => Some(res),
        };

        let mut unsent = Vec::new();
        match dialed {
            None => {}
            Some(Err(err)) => self.emit(LinkEvent::Failed(err)),
            Some(Ok(link)) => {
                self.emit(LinkEvent::Opened);
                self.pump(link, &mut rx, &mut unsent).await;
            }
        }

        rx.close();
        while let Ok(message) = rx.try_recv() {
            unsent.push(message);
        }
        unsent.retain(|m| !m.is_heartbeat());
        self.emit(LinkEvent::Closed {
            undelivered: unsent,
        });
    }

    async fn pump(
        &self,
        mut link: Box<dyn Link>,
        rx: &mut mpsc::UnboundedReceiver<Message>,
        unsent: &mut Vec<Message>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    close(link.as_mut()).await;
                    return;
                }
                out = rx.recv() => {
                    let Some(message) = out else {
                        close(link.as_mut()).await;
                        return;
                    };
                    let frame = match message.encode() {
                        Ok(frame) => frame,
                        Err(err) => {
                            tracing::warn!(
                                target: "shiftlink::link",
                                message_id = %message.id,
                                error = %err,
                                "outbound message not encodable; dropped"
                            );
                            continue;
                        }
                    };
                    if let Err(err) = link.send(frame).await {
                        unsent.push(message);
                        self.emit(LinkEvent::Failed(err));
                        return;
                    }
                }
                inbound = link.recv() => match inbound {
                    Some(Ok(frame)) => self.emit(LinkEvent::Frame(frame)),
                    Some(Err(err)) => {
                        self.emit(LinkEvent::Failed(err));
                        return;
                    }
                    None => return,
                },
            }
        }
    }
}

async fn close(link: &mut dyn Link) {
    if time::timeout(CLOSE_GRACE, link.close()).await.is_err() {
        tracing::debug!(target: "shiftlink::link", "graceful close timed out");
    }
}
