//! Error types used by the session runtime and its collaborators.
//!
//! - [`TransportError`] failures of the underlying link (connect/send/receive).
//! - [`FrameError`] an inbound frame that could not be decoded into a [`Message`](crate::Message).
//! - [`ConfigError`] invalid [`SessionConfig`](crate::SessionConfig) or identity.
//! - [`AlertError`] a platform alert could not be shown.
//!
//! None of these are ever returned from the consumer-facing session operations:
//! transport failures surface as connection state, frame errors are dropped and
//! logged. Every enum provides `as_label` for logs.

use thiserror::Error;

/// # Errors produced by a transport link.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect to {endpoint} failed: {reason}")]
    Connect {
        /// Endpoint that was dialed.
        endpoint: String,
        /// Underlying failure message.
        reason: String,
    },

    /// Writing a frame to the link failed.
    #[error("send failed: {reason}")]
    Send {
        /// Underlying failure message.
        reason: String,
    },

    /// Reading from the link failed.
    #[error("receive failed: {reason}")]
    Receive {
        /// Underlying failure message.
        reason: String,
    },

    /// The link is already closed.
    #[error("link closed")]
    Closed,
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use shiftlink::TransportError;
    ///
    /// assert_eq!(TransportError::Closed.as_label(), "transport_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "transport_connect",
            TransportError::Send { .. } => "transport_send",
            TransportError::Receive { .. } => "transport_receive",
            TransportError::Closed => "transport_closed",
        }
    }
}

/// # Errors produced while decoding an inbound frame.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FrameError {
    /// The frame is not a valid JSON message (unknown type, wrong shape, bad timestamp...).
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// A binary frame that is not valid UTF-8.
    #[error("binary frame is not utf-8 ({len} bytes)")]
    NotUtf8 {
        /// Size of the rejected frame.
        len: usize,
    },
}

impl FrameError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FrameError::Decode(_) => "frame_decode",
            FrameError::NotUtf8 { .. } => "frame_not_utf8",
        }
    }
}

/// # Errors produced while validating configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `endpoint` is not a parseable URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Configured endpoint.
        endpoint: String,
        /// Parser message.
        reason: String,
    },

    /// `endpoint` uses a scheme other than `ws`/`wss` (or cannot carry path segments).
    #[error("unsupported endpoint scheme {scheme:?} (expected ws or wss)")]
    UnsupportedScheme {
        /// Offending scheme.
        scheme: String,
    },

    /// Identity token is empty.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// No transport was supplied and the `websocket` feature is disabled.
    #[error("no transport configured")]
    NoTransport,

    /// `build` was called outside a Tokio runtime.
    #[error("session must be built inside a tokio runtime")]
    NoRuntime,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidEndpoint { .. } => "config_invalid_endpoint",
            ConfigError::UnsupportedScheme { .. } => "config_unsupported_scheme",
            ConfigError::EmptyIdentity => "config_empty_identity",
            ConfigError::NoTransport => "config_no_transport",
            ConfigError::NoRuntime => "config_no_runtime",
        }
    }
}

/// # Errors produced by an [`AlertSink`](crate::AlertSink).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// The platform refused because permission is not granted.
    #[error("alert permission denied")]
    Denied,

    /// The platform facility failed.
    #[error("platform alert failed: {reason}")]
    Platform {
        /// Underlying failure message.
        reason: String,
    },
}

impl AlertError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AlertError::Denied => "alert_denied",
            AlertError::Platform { .. } => "alert_platform",
        }
    }
}
