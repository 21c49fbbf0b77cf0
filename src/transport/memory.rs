//! # In-process transport.
//!
//! [`memory()`] returns a connected pair: a [`MemoryTransport`] to hand to a
//! session and a [`MemoryServer`] that plays the remote side.
//!
//! ```text
//! Session ── MemoryTransport::connect ──► MemoryServer::accept() ──► MemoryPeer
//!             MemoryLink::send   ───────────────────────────────►  peer.recv()
//!             MemoryLink::recv   ◄───────────────────────────────  peer.push(frame) / push_bytes() / fault() / hang_up()
//! ```
//!
//! The server can refuse dials ([`MemoryServer::refuse_next`]) and counts dials
//! and client-initiated closes, which makes reconnect behaviour observable.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{FrameError, TransportError};
use crate::message::Message;
use crate::transport::{Frame, Link, Transport};

struct ServerShared {
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
    refuse: AtomicU32,
    dials: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

/// Creates an in-process transport and its server end.
pub fn memory() -> (MemoryTransport, MemoryServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(ServerShared {
        accept_tx,
        refuse: AtomicU32::new(0),
        dials: AtomicUsize::new(0),
        closes: Arc::new(AtomicUsize::new(0)),
    });
    (
        MemoryTransport {
            shared: Arc::clone(&shared),
        },
        MemoryServer { shared, accept_rx },
    )
}

/// Client side of the in-process transport.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<ServerShared>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError> {
        self.shared.dials.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .shared
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            endpoint: endpoint.to_string(),
            outbound: to_client,
            inbound: from_client,
        };
        self.shared
            .accept_tx
            .send(peer)
            .map_err(|_| TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "server is gone".to_string(),
            })?;

        Ok(Box::new(MemoryLink {
            inbound: from_server,
            outbound: Some(to_server),
            closes: Arc::clone(&self.shared.closes),
        }))
    }
}

/// Server side: accepts links and scripts failures.
pub struct MemoryServer {
    shared: Arc<ServerShared>,
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Waits for the next successful dial.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    /// Refuses the next `n` dials.
    pub fn refuse_next(&self, n: u32) {
        self.shared.refuse.store(n, Ordering::SeqCst);
    }

    /// Dials observed so far, refused ones included.
    pub fn dials(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }

    /// Graceful closes initiated by clients.
    pub fn client_closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

/// The server's view of one accepted link.
pub struct MemoryPeer {
    endpoint: String,
    outbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Endpoint the client dialed.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a raw text frame to the client. Returns `false` if the client is gone.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        self.outbound.send(Ok(Frame::Text(frame.into()))).is_ok()
    }

    /// Sends a raw binary frame to the client.
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.outbound.send(Ok(Frame::Binary(bytes.into()))).is_ok()
    }

    /// Sends an encoded message to the client.
    pub fn push_message(&self, message: &Message) -> bool {
        match message.encode() {
            Ok(frame) => self.push(frame),
            Err(_) => false,
        }
    }

    /// Delivers a receive error to the client.
    pub fn fault(&self, reason: impl Into<String>) -> bool {
        self.outbound
            .send(Err(TransportError::Receive {
                reason: reason.into(),
            }))
            .is_ok()
    }

    /// Next frame written by the client; `None` once the client closed or dropped the link.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Next frame written by the client, decoded.
    pub async fn recv_message(&mut self) -> Option<Result<Message, FrameError>> {
        self.recv().await.map(|frame| Message::decode(&frame))
    }

    /// Closes the link from the server side.
    pub fn hang_up(self) {}
}

struct MemoryLink {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let tx = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Send {
            reason: "peer hung up".to_string(),
        })
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        if self.outbound.is_none() {
            return None;
        }
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        if self.outbound.take().is_some() {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inbound.close();
        }
    }
}
