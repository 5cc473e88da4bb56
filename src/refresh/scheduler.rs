//! Periodic refresh owned by a single cancellable task handle.
//!
//! Reconfiguring aborts the running task and spawns a fresh one with the new
//! period; a period of `None` leaves the scheduler disarmed. Failures are logged
//! and the next tick tries again. Ticks do not wait for each other's refresh to
//! finish beyond the task's own sequential loop.

use super::RefreshTask;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct RefreshScheduler {
    task: Arc<dyn RefreshTask>,
    handle: Option<JoinHandle<()>>,
    period: Option<Duration>,
}

impl RefreshScheduler {
    /// A disarmed scheduler. Must be armed from within a tokio runtime.
    pub fn new(task: Arc<dyn RefreshTask>) -> Self {
        Self {
            task,
            handle: None,
            period: None,
        }
    }

    /// Tear down the current timer and start one with `period` (`None` disarms).
    pub fn reconfigure(&mut self, period: Option<Duration>) {
        self.cancel();
        self.period = period.filter(|p| !p.is_zero());

        let Some(period) = self.period else {
            info!("Background refresh disabled");
            return;
        };

        let task = Arc::clone(&self.task);
        info!(seconds = period.as_secs(), "Background refresh armed");
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match task.run().await {
                    Ok(snapshot) => debug!(
                        profiles = snapshot.profiles.len(),
                        permission_sets = snapshot.permission_sets.len(),
                        "Background refresh completed"
                    ),
                    Err(e) => warn!(error = %e, "Background refresh failed"),
                }
            }
        }));
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Dispose of the timer.
    pub fn shutdown(&mut self) {
        self.cancel();
        self.period = None;
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
