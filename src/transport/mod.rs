//! # Transport seam.
//!
//! A [`Transport`] dials an endpoint and yields a [`Link`]: a bidirectional
//! stream of frames. The session owns exactly one link at a time and
//! drives it from a dedicated pump task.
//!
//! ```text
//! Transport::connect(endpoint) ──► Box<dyn Link>
//!                                     ├─ send(frame)   outbound JSON text
//!                                     ├─ recv()        Some(Ok(Frame)) | Some(Err(e)) | None (closed)
//!                                     └─ close()       graceful close, called at most once by the session
//! ```
//!
//! ## Implementations
//! - [`WsTransport`] WebSocket over `tokio-tungstenite` (feature `websocket`, on by default)
//! - [`memory`] in-process transport + scripted server, for tests and demos
//!
//! ## Contract
//! - `recv` must be cancel-safe: the pump polls it inside `tokio::select!`.
//! - `recv` returning `None` means the peer closed; the link is not reused.
//! - `recv` hands over frames undecoded. A frame that is not a valid message is
//!   the session's business, never a transport error.

mod memory;
#[cfg(feature = "websocket")]
mod websocket;

use async_trait::async_trait;

use crate::error::{FrameError, TransportError};
use crate::message::Message;

pub use memory::{MemoryPeer, MemoryServer, MemoryTransport, memory};
#[cfg(feature = "websocket")]
pub use websocket::WsTransport;

/// One inbound frame as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Decodes the frame as a JSON message.
    pub fn decode(&self) -> Result<Message, FrameError> {
        match self {
            Frame::Text(text) => Message::decode(text),
            Frame::Binary(bytes) => Message::decode_bytes(bytes),
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

/// Dials endpoints.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a link to `endpoint` (already scoped to the session identity).
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError>;
}

/// One open connection.
#[async_trait]
pub trait Link: Send {
    /// Writes a text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame; `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Closes the link gracefully.
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frames_must_be_utf8() {
        let bad = Frame::Binary(vec![0xff, 0xfe]);
        assert!(matches!(bad.decode(), Err(FrameError::NotUtf8 { len: 2 })));
        assert_eq!(bad.len(), 2);

        let good = Frame::Binary(br#"{"type":"task_update","id":"t-1"}"#.to_vec());
        assert_eq!(good.decode().unwrap().id, "t-1");
    }
}
