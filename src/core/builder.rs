use std::sync::Arc;

use tokio::sync::mpsc;

use crate::alerts::{AlertSink, NoopAlerts, Notifier};
use crate::core::driver::Driver;
use crate::core::shared::Shared;
use crate::core::{Session, SessionConfig};
use crate::error::ConfigError;
use crate::events::Bus;
use crate::transport::Transport;

/// Builder for a [`Session`].
pub struct SessionBuilder {
    cfg: SessionConfig,
    transport: Option<Arc<dyn Transport>>,
    alerts: Arc<dyn AlertSink>,
}

impl SessionBuilder {
    /// Creates a builder with the given configuration, the default transport and no alerts.
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            cfg,
            transport: None,
            alerts: Arc::new(NoopAlerts),
        }
    }

    /// Uses `transport` instead of the WebSocket default.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Shows `notification` messages through `alerts`.
    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Validates the configuration and spawns the session driver.
    ///
    /// Must be called inside a Tokio runtime. The session starts disconnected.
    pub fn build(self) -> Result<Session, ConfigError> {
        self.cfg.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let shared = Arc::new(Shared::new(self.cfg.history_capacity));
        let notifier = Notifier::new(self.alerts, bus.clone());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();

        let driver = Driver::new(
            self.cfg,
            transport,
            Arc::clone(&shared),
            bus.clone(),
            notifier,
            inputs_tx,
        );
        runtime.spawn(driver.run(commands_rx, inputs_rx));

        Ok(Session::from_parts(commands_tx, shared, bus))
    }
}

#[cfg(feature = "websocket")]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Ok(Arc::new(crate::transport::WsTransport))
}

#[cfg(not(feature = "websocket"))]
fn default_transport() -> Result<Arc<dyn Transport>, ConfigError> {
    Err(ConfigError::NoTransport)
}
