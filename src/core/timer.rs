//! One-shot reconnect timer.
//!
//! Arming posts [`Input::ReconnectDue`] after the delay unless cancelled first.
//! Each arm gets a fresh ticket so a firing that raced a cancel is recognisable.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::driver::Input;

#[derive(Default)]
pub(crate) struct ReconnectTimer {
    ticket: u64,
    pending: Option<(CancellationToken, Duration)>,
}

impl ReconnectTimer {
    /// Arms the timer, replacing any pending one.
    pub(crate) fn arm(&mut self, delay: Duration, inputs: &mpsc::UnboundedSender<Input>) {
        self.cancel();
        self.ticket += 1;
        let ticket = self.ticket;
        let token = CancellationToken::new();
        let child = token.clone();
        let inputs = inputs.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = time::sleep(delay) => {
                    let _ = inputs.send(Input::ReconnectDue { ticket });
                }
            }
        });
        self.pending = Some((token, delay));
    }

    /// Cancels a pending timer. Returns `false` if none was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((token, _)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Consumes the pending timer if `ticket` is its firing.
    pub(crate) fn fire(&mut self, ticket: u64) -> bool {
        if self.pending.is_some() && ticket == self.ticket {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Delay of the pending timer.
    pub(crate) fn delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(_, delay)| *delay)
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
