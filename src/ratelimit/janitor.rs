//! Periodic eviction of idle rate limit records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::limiter::RateLimiter;

/// Runs [`RateLimiter::cleanup`] on a fixed period.
#[derive(Debug)]
pub struct Janitor {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl Janitor {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep runs one full interval after start. The loop runs
    /// until [`JanitorHandle::shutdown`] is called or the handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the interval is zero or if called outside a tokio runtime.
    pub fn start(self) -> JanitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let Janitor { limiter, interval } = self;

        info!(interval_secs = interval.as_secs(), "Starting rate limit janitor");

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = limiter.cleanup();
                        debug!(
                            evicted = evicted,
                            tracked = limiter.tracked_principals(),
                            "Janitor sweep complete"
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        // An error means the handle was dropped.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Rate limit janitor stopped");
        });

        JanitorHandle { shutdown_tx, task }
    }
}

/// Control handle for a running [`Janitor`].
#[derive(Debug)]
pub struct JanitorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Stop the janitor and wait for its task to finish.
    ///
    /// A sweep already in progress completes first.
    pub async fn shutdown(self) {
        // The receiver only goes away if the task already exited.
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Rate limit janitor task ended abnormally");
        }
    }

    /// Whether the janitor task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
