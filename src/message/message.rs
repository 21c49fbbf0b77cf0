//! # Wire message and inbound decoding.
//!
//! ```text
//! {"id":"…","type":"task_update","payload":{…},"timestamp":"2026-…Z","originUserId":"u1","broadcast":false}
//! ```
//!
//! Inbound frames may omit `id` and `timestamp`; [`Message::decode`] assigns
//! them exactly once on receipt. `payload` may be absent or `null` (empty object).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FrameError;
use crate::message::MessageKind;

/// Opaque structured payload.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A message as exchanged with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique per connection lifetime.
    pub id: String,
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Opaque payload; the client never interprets it (except alert title/body).
    #[serde(default)]
    pub payload: Payload,
    /// Creation time (sender's clock, or receipt time if the sender left it out).
    pub timestamp: DateTime<Utc>,
    /// Identity of the originating user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_user_id: Option<String>,
    /// Intended for multiple recipients.
    #[serde(default)]
    pub broadcast: bool,
}

/// Inbound shape: everything the server may leave out is optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundFrame {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default)]
    payload: Option<Payload>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    origin_user_id: Option<String>,
    #[serde(default)]
    broadcast: Option<bool>,
}

/// Generates a fresh message id.
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    /// Decodes an inbound text frame, assigning `id`/`timestamp` when missing.
    pub fn decode(frame: &str) -> Result<Self, FrameError> {
        let raw: InboundFrame = serde_json::from_str(frame)?;
        Ok(Self {
            id: raw
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(new_message_id),
            kind: raw.kind,
            payload: raw.payload.unwrap_or_default(),
            timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            origin_user_id: raw.origin_user_id,
            broadcast: raw.broadcast.unwrap_or(false),
        })
    }

    /// Decodes a binary frame (must be UTF-8 JSON).
    pub fn decode_bytes(frame: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(frame).map_err(|_| FrameError::NotUtf8 { len: frame.len() })?;
        Self::decode(text)
    }

    /// Encodes as a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Reads a string field from the payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    #[inline]
    pub fn is_heartbeat(&self) -> bool {
        self.kind.is_heartbeat()
    }
}
