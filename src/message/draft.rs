//! # Outbound drafts
//!
//! A [`Draft`] is what callers hand to `Session::send_message`. The session
//! seals it into a [`Message`] by filling `id` (unless the caller set one),
//! `timestamp` and `originUserId`.

use chrono::Utc;
use serde_json::Value;

use crate::message::{Message, MessageKind, Payload, new_message_id};

/// Partial message submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    kind: MessageKind,
    payload: Payload,
    broadcast: bool,
    id: Option<String>,
}

impl Draft {
    /// Starts a draft with an empty payload.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: Payload::new(),
            broadcast: false,
            id: None,
        }
    }

    /// Replaces the payload.
    ///
    /// Objects are used as-is, `null` clears it, any other value is stored under `"value"`.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = match payload {
            Value::Object(map) => map,
            Value::Null => Payload::new(),
            other => {
                let mut map = Payload::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self
    }

    /// Sets a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Marks the message as broadcast.
    pub fn broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }

    /// Uses a caller-assigned id instead of a generated one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Fills `id` (unless set), `timestamp` and `originUserId`.
    ///
    /// Sessions do this on `send_message`; call it directly to build server-side fixtures.
    pub fn seal(self, origin: Option<&str>) -> Message {
        Message {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(new_message_id),
            kind: self.kind,
            payload: self.payload,
            timestamp: Utc::now(),
            origin_user_id: origin.map(str::to_owned),
            broadcast: self.broadcast,
        }
    }
}
