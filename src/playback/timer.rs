use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::events::DecayTick;

/// Sole owner of the radius-decay schedule.
///
/// At most one ticker task is alive at a time: [`DecayTimer::restart`] cancels the
/// previous one before spawning its replacement, and every tick carries the epoch
/// of the schedule that produced it so a tick already in flight can be told apart.
#[derive(Debug)]
pub struct DecayTimer {
    period: Duration,
    epoch: u64,
    running: Option<CancellationToken>,
    parent: CancellationToken,
    tx: UnboundedSender<DecayTick>,
}

impl DecayTimer {
    pub fn channel(
        period: Duration,
        parent: CancellationToken,
    ) -> (Self, UnboundedReceiver<DecayTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            period,
            epoch: 0,
            running: None,
            parent,
            tx,
        };
        (timer, rx)
    }

    /// Cancel any running schedule and start a fresh one. Must be called from
    /// within a tokio runtime.
    pub fn restart(&mut self) -> u64 {
        self.stop();
        self.epoch += 1;
        let token = self.parent.child_token();
        tokio::spawn(run_ticker(
            token.clone(),
            self.epoch,
            self.period,
            self.tx.clone(),
        ));
        self.running = Some(token);
        self.epoch
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether `tick` belongs to the schedule currently running.
    #[must_use]
    pub fn accepts(&self, tick: DecayTick) -> bool {
        self.running.is_some() && tick.epoch == self.epoch
    }
}

impl Drop for DecayTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticker(
    cancel: CancellationToken,
    epoch: u64,
    period: Duration,
    tx: UnboundedSender<DecayTick>,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {
                trace!(epoch, "decay tick");
                if tx.send(DecayTick { epoch }).is_err() {
                    break;
                }
            }
        }
    }
}
