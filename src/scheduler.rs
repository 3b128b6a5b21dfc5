//! # Escalation Scheduler
//!
//! Background task that runs the SLA escalation sweep on a fixed interval
//! until shutdown is requested. Started explicitly by the process entry point.

use std::time::Duration;

use metrics::histogram;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::escalation::EscalationSweeper;

pub struct EscalationScheduler {
    sweeper: EscalationSweeper,
    tick_interval: Duration,
}

impl EscalationScheduler {
    pub fn new(sweeper: EscalationSweeper, tick_interval: Duration) -> Self {
        Self {
            sweeper,
            tick_interval,
        }
    }

    /// Spawns the loop on the runtime.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweeps every `tick_interval` until the shutdown token fires. The first
    /// sweep happens one interval after start.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.tick_interval.as_secs(),
            "Starting escalation scheduler"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Escalation scheduler shutdown requested");
                    break;
                }
                _ = sleep(self.tick_interval) => {
                    let tick_started = Instant::now();
                    let stats = self.sweeper.sweep().await;
                    histogram!("escalation_sweep_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                    if stats.failed_passes > 0 {
                        tracing::warn!(failed_passes = stats.failed_passes, "Escalation sweep incomplete, retrying next tick");
                    }
                }
            }
        }

        info!("Escalation scheduler stopped");
    }
}
