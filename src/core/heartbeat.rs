//! # Heartbeat ticker.
//!
//! While the session is connected a ticker task posts
//! [`Input::HeartbeatTick`](crate::core::driver::Input) to the driver every
//! `period`; the driver writes the heartbeat frame itself.
//!
//! ```text
//! start() ─► run += 1, spawn ticker(run) ──tick──► Input::HeartbeatTick { run }
//! stop()  ─► cancel ticker
//! accepts(run) ─► ticker alive && run == current run
//! ```
//!
//! ## Rules
//! - At most one ticker exists; `start` while running and `stop` while stopped are no-ops.
//! - A tick already queued when the ticker is stopped carries a stale `run` and is rejected by [`Heartbeat::accepts`].
//! - The first tick fires one full `period` after `start`; missed ticks are delayed, not bursted.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::driver::Input;

pub(crate) struct Heartbeat {
    period: Option<Duration>,
    run: u64,
    ticker: Option<CancellationToken>,
}

impl Heartbeat {
    /// `period = None` disables heartbeats entirely.
    pub(crate) fn new(period: Option<Duration>) -> Self {
        Self {
            period,
            run: 0,
            ticker: None,
        }
    }

    /// Spawns the ticker. Returns `false` if already running or disabled.
    pub(crate) fn start(&mut self, inputs: &mpsc::UnboundedSender<Input>) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        if self.ticker.is_some() {
            return false;
        }

        self.run += 1;
        let run = self.run;
        let token = CancellationToken::new();
        let child = token.clone();
        let inputs = inputs.clone();

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        if inputs.send(Input::HeartbeatTick { run }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.ticker = Some(token);
        true
    }

    /// Cancels the ticker. Returns `false` if it was not running.
    pub(crate) fn stop(&mut self) -> bool {
        match self.ticker.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// True if a tick from `run` belongs to the live ticker.
    pub(crate) fn accepts(&self, run: u64) -> bool {
        self.ticker.is_some() && run == self.run
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
