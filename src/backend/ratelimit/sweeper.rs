/**
 * Rate State Sweeper
 *
 * Periodically evicts idle, unblocked keys from a limiter. The sweep takes
 * the limiter lock for the duration of one pass, so it is safe to run
 * alongside live traffic.
 */
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::limiter::RateLimiter;

/// Handle to a running sweeper task
///
/// Dropping the handle stops the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the sweeper and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Aborted tasks resolve to a cancellation error
            let _ = task.await;
            tracing::debug!("[RateLimiter:{}] Sweeper stopped", self.name);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn a sweeper that runs every `interval`
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> SweeperHandle {
    let name = limiter.name();
    tracing::info!("[RateLimiter:{}] Sweeping idle keys every {}s", name, interval.as_secs());

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.sweep();
            tracing::debug!("[RateLimiter:{}] Sweep evicted {} keys", limiter.name(), evicted);
        }
    });

    SweeperHandle {
        name,
        task: Some(task),
    }
}
