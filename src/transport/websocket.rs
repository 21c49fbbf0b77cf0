//! WebSocket transport over `tokio-tungstenite`.
//!
//! Text and binary frames are both handed to the session, which decodes them.
//! Ping/pong is handled by tungstenite and never reaches the session.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::TransportError;
use crate::transport::{Frame, Link, Transport};

/// Dials `ws://` (and, with `websocket-tls`, `wss://`) endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError> {
        let (stream, response) =
            connect_async(endpoint)
                .await
                .map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        tracing::debug!(
            target: "shiftlink::transport",
            endpoint,
            status = %response.status(),
            "websocket handshake complete"
        );
        Ok(Box::new(WsLink {
            stream,
            closed: false,
        }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Send {
                reason: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let next = self.stream.next().await?;
            match next {
                Ok(WsMessage::Text(text)) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(WsMessage::Binary(bytes)) => return Some(Ok(Frame::Binary(bytes.to_vec()))),
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(target: "shiftlink::transport", ?frame, "server closed websocket");
                    return None;
                }
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => continue,
                Err(e) => {
                    return Some(Err(TransportError::Receive {
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(target: "shiftlink::transport", error = %e, "websocket close failed");
        }
    }
}
