//! # Session configuration.
//!
//! Provides [`SessionConfig`], the settings for one session.
//!
//! Config is consumed once, by `SessionBuilder::build`, which validates it.
//!
//! ## Sentinel values
//! - `heartbeat_interval = 0s` → no heartbeats
//! - `liveness_window = 0s` → liveness check disabled
//! - `outbound_capacity = 0` → unbounded outbound queue
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use shiftlink::{OverflowPolicy, SessionConfig};
//!
//! let mut cfg = SessionConfig::default();
//! cfg.endpoint = "wss://shifts.example.com/ws".into();
//! cfg.heartbeat_interval = Duration::from_secs(15);
//! cfg.overflow = OverflowPolicy::RejectNew;
//!
//! let url = cfg.endpoint_for("user 42").unwrap();
//! assert_eq!(url.as_str(), "wss://shifts.example.com/ws/user%2042");
//! ```

use std::time::Duration;

use url::Url;

use crate::buffers::{DEFAULT_HISTORY_CAPACITY, DEFAULT_OUTBOUND_CAPACITY};
use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, OverflowPolicy};

/// Configuration for one session.
///
/// ## Field semantics
/// - `endpoint`: base `ws://` or `wss://` URL; the identity is appended as the last path segment
/// - `reconnect`: delay growth between automatic reconnects
/// - `max_reconnect_attempts`: automatic reconnects before giving up (`retry_connection` resets)
/// - `heartbeat_interval`: period of outgoing heartbeats while connected (`0s` = off)
/// - `liveness_window`: close the link when nothing arrives for this long (`0s` = off)
/// - `history_capacity`: inbound messages kept (min 1)
/// - `outbound_capacity`: messages queued while disconnected (`0` = unbounded)
/// - `overflow`: what a full outbound queue does with the next message
/// - `bus_capacity`: lifecycle event ring buffer (min 1)
///
/// All fields are public. Prefer the helper accessors over checking sentinels inline.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Base endpoint URL.
    pub endpoint: String,

    /// Backoff between automatic reconnects.
    pub reconnect: BackoffPolicy,

    /// Automatic reconnects allowed after a close.
    pub max_reconnect_attempts: u32,

    /// Heartbeat period.
    pub heartbeat_interval: Duration,

    /// Maximum silence from the server before the link is considered dead.
    ///
    /// Checked on heartbeat ticks, so it only has an effect when heartbeats are enabled.
    pub liveness_window: Duration,

    /// Number of inbound messages kept in history.
    pub history_capacity: usize,

    /// Bound of the outbound queue.
    pub outbound_capacity: usize,

    /// Outbound overflow behaviour.
    pub overflow: OverflowPolicy,

    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,
}

impl SessionConfig {
    /// Heartbeat period, or `None` when disabled.
    #[inline]
    pub fn heartbeat_period(&self) -> Option<Duration> {
        if self.heartbeat_interval.is_zero() {
            None
        } else {
            Some(self.heartbeat_interval)
        }
    }

    /// Liveness window, or `None` when disabled.
    #[inline]
    pub fn liveness_limit(&self) -> Option<Duration> {
        if self.liveness_window.is_zero() {
            None
        } else {
            Some(self.liveness_window)
        }
    }

    /// Outbound bound, or `None` for unbounded.
    #[inline]
    pub fn outbound_limit(&self) -> Option<usize> {
        if self.outbound_capacity == 0 {
            None
        } else {
            Some(self.outbound_capacity)
        }
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that `endpoint` is a `ws`/`wss` URL able to carry an identity segment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url().map(|_| ())
    }

    /// Endpoint for `identity`: the base URL with the identity pushed as a path segment.
    pub fn endpoint_for(&self, identity: &str) -> Result<Url, ConfigError> {
        if identity.trim().is_empty() {
            return Err(ConfigError::EmptyIdentity);
        }
        let mut url = self.base_url()?;
        let scheme = url.scheme().to_string();
        url.path_segments_mut()
            .map_err(|()| ConfigError::UnsupportedScheme { scheme })?
            .pop_if_empty()
            .push(identity);
        Ok(url)
    }

    fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" if !url.cannot_be_a_base() => Ok(url),
            other => Err(ConfigError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

impl Default for SessionConfig {
    /// Default configuration:
    ///
    /// - `endpoint = "ws://127.0.0.1:8080/ws"`
    /// - `reconnect = BackoffPolicy::default()` (1s, ×2, capped at 30s)
    /// - `max_reconnect_attempts = 5`
    /// - `heartbeat_interval = 30s`
    /// - `liveness_window = 0s` (off)
    /// - `history_capacity = 100`
    /// - `outbound_capacity = 256`
    /// - `overflow = OverflowPolicy::DropOldest`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080/ws".to_string(),
            reconnect: BackoffPolicy::default(),
            max_reconnect_attempts: 5,
            heartbeat_interval: Duration::from_secs(30),
            liveness_window: Duration::ZERO,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            overflow: OverflowPolicy::default(),
            bus_capacity: 1024,
        }
    }
}
