//! Expiry sweeper.
//!
//! Times out unanswered challenges without waiting for a triggering event.
//! Each record is claimed by a conditional delete before any external action,
//! so overlapping runs or a racing answer cannot remove a participant twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ModerationEngine;

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired pending challenges found
    pub expired: usize,
    /// Of those, the ones this run timed out
    pub removed: usize,
    /// Stale cooldown records dropped
    pub purged_cooldowns: u64,
}

impl ModerationEngine {
    /// Time out every pending challenge whose deadline has passed.
    pub async fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        match self.store.expired_challenges(now).await {
            Ok(records) => {
                report.expired = records.len();
                for record in &records {
                    if self.verifier.expire(record, now).await {
                        report.removed += 1;
                    }
                }
            }
            Err(e) => warn!("Expiry sweep could not list challenges: {}", e),
        }

        report.purged_cooldowns = self.counters.purge_stale(now).await;
        report
    }
}

/// Background task running `sweep_expired` on a fixed interval.
pub struct ExpirySweeper {
    engine: Arc<ModerationEngine>,
    interval: Duration,
    first_delay: Duration,
}

impl ExpirySweeper {
    pub fn new(engine: Arc<ModerationEngine>) -> Self {
        let settings = engine.settings();
        Self {
            interval: settings.sweep_interval,
            first_delay: settings.sweep_first_delay,
            engine,
        }
    }

    /// Start sweeping until a shutdown signal arrives.
    pub fn spawn(self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.first_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_secs = self.interval.as_secs(),
                "Expiry sweeper started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.engine.sweep_expired().await;
                        if report.removed > 0 || report.purged_cooldowns > 0 {
                            info!(
                                expired = report.expired,
                                removed = report.removed,
                                purged_cooldowns = report.purged_cooldowns,
                                "Expiry sweep finished"
                            );
                        } else {
                            debug!("Expiry sweep: nothing to do");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received shutdown signal, stopping expiry sweeper");
                        break;
                    }
                }
            }
        })
    }
}
