use chrono::Duration;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const TICK: std::time::Duration = std::time::Duration::from_secs(1);

pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Wakes once per second until the next day unlocks, then runs `on_elapsed`.
///
/// Dropping the watch stops the ticker.
pub struct UnlockWatch {
    handle: JoinHandle<()>,
}

impl UnlockWatch {
    pub fn start<F, Fut>(remaining: Duration, on_elapsed: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let remaining = remaining.to_std().unwrap_or_default();
        let deadline = Instant::now() + remaining;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                debug!(left_secs = (deadline - now).as_secs(), "waiting for next day unlock");
            }
            on_elapsed().await;
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for UnlockWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
