//! Debounces task toggles into one persist call per `(day, task)`.
//!
//! Each toggle replaces any pending timer for the same key. When the quiet
//! period elapses the entry leaves the table, the new value is merged into
//! the latest known flags for that day, and exactly one update is sent. A
//! later toggle never cancels a call that is already in flight.
//!
//! Fires go out one at a time, so each merge reads the flags left by the
//! previous save rather than a snapshot taken before it landed.

use crate::errors::ClientError;
use crate::models::{ProgressRecord, ProgressUpdate, TaskFlags, TaskName};
use crate::notify::Notice;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);
pub const DEFAULT_UNLOCK_REFRESH_DELAY: Duration = Duration::from_millis(1000);

/// Where the coalescer reads known state from and sends updates to.
pub trait ProgressStore: Send + Sync + 'static {
    fn available_day(&self) -> impl Future<Output = Result<u8, ClientError>> + Send;

    /// Flags the backend holds for `day`; `None` when it has no entry yet.
    fn known_tasks(
        &self,
        day: u8,
    ) -> impl Future<Output = Result<Option<TaskFlags>, ClientError>> + Send;

    fn persist(
        &self,
        update: ProgressUpdate,
    ) -> impl Future<Output = Result<ProgressRecord, ClientError>> + Send;

    fn invalidate(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub day: u8,
    pub task: TaskName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Scheduled,
    Replaced,
    Rejected,
}

impl ToggleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ToggleOutcome::Scheduled => "scheduled",
            ToggleOutcome::Replaced => "replaced",
            ToggleOutcome::Rejected => "rejected",
        }
    }
}

struct Pending {
    id: u64,
    value: bool,
    handle: JoinHandle<()>,
}

struct Shared<S> {
    store: S,
    pending: Mutex<HashMap<TaskKey, Pending>>,
    followups: Mutex<Vec<JoinHandle<()>>>,
    // Held from the merge read until the saved flags are visible to the next read.
    lane: Mutex<()>,
    notices: mpsc::UnboundedSender<Notice>,
    next_id: AtomicU64,
    // Bumped on teardown; work started under an older epoch stays silent.
    epoch: AtomicU64,
    quiet: Duration,
    refresh_delay: Duration,
}

impl<S> Shared<S> {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("notice receiver dropped");
        }
    }
}

pub struct Coalescer<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Coalescer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: ProgressStore> Coalescer<S> {
    pub fn new(
        store: S,
        notices: mpsc::UnboundedSender<Notice>,
        quiet: Duration,
        refresh_delay: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                pending: Mutex::new(HashMap::new()),
                followups: Mutex::new(Vec::new()),
                lane: Mutex::new(()),
                notices,
                next_id: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                quiet,
                refresh_delay,
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Schedules a persist of `task = value` for `day`.
    ///
    /// Only the currently available day accepts toggles; anything else is
    /// rejected without touching the table. Failing to learn the available
    /// day is an error for the caller, not a rejection.
    pub async fn toggle(
        &self,
        day: u8,
        task: TaskName,
        value: bool,
    ) -> Result<ToggleOutcome, ClientError> {
        let available = self.shared.store.available_day().await?;
        if available != day {
            debug!(day, available, "toggle rejected for a day that is not available");
            return Ok(ToggleOutcome::Rejected);
        }

        let key = TaskKey { day, task };
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let epoch = self.shared.epoch.load(Ordering::SeqCst);

        let mut pending = self.shared.pending.lock().await;
        let outcome = match pending.remove(&key) {
            Some(previous) => {
                previous.handle.abort();
                ToggleOutcome::Replaced
            }
            None => ToggleOutcome::Scheduled,
        };

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(shared.quiet).await;
            fire(shared, key, id, epoch).await;
        });
        pending.insert(key, Pending { id, value, handle });

        debug!(day, task = task.label(), value, ?outcome, "progress toggle queued");
        Ok(outcome)
    }

    pub async fn pending_count(&self) -> usize {
        self.shared.pending.lock().await.len()
    }

    /// Cancels every timer that has not fired yet.
    ///
    /// Calls already in flight finish, but their results are not published.
    pub async fn shutdown(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);

        let mut pending = self.shared.pending.lock().await;
        let cancelled = pending.len();
        for (_, entry) in pending.drain() {
            entry.handle.abort();
        }
        drop(pending);

        let mut followups = self.shared.followups.lock().await;
        for handle in followups.drain(..) {
            handle.abort();
        }

        if cancelled > 0 {
            info!(cancelled, "cancelled pending progress updates");
        }
    }
}

async fn fire<S: ProgressStore>(shared: Arc<Shared<S>>, key: TaskKey, id: u64, epoch: u64) {
    let value = {
        let mut pending = shared.pending.lock().await;
        match pending.get(&key) {
            Some(entry) if entry.id == id => {}
            _ => return,
        }
        match pending.remove(&key) {
            Some(entry) => entry.value,
            None => return,
        }
    };

    let lane = shared.lane.lock().await;
    if !shared.is_current(epoch) {
        return;
    }

    let known = match shared.store.known_tasks(key.day).await {
        Ok(known) => known.unwrap_or_default(),
        Err(err) => {
            drop(lane);
            if shared.is_current(epoch) {
                warn!(day = key.day, error = %err, "could not read progress before saving");
                report_failure(&shared, err);
            }
            return;
        }
    };
    let flags = known.with(key.task, value);
    let result = shared.store.persist(ProgressUpdate::new(key.day, flags)).await;

    if !shared.is_current(epoch) {
        debug!(day = key.day, "discarding progress result after teardown");
        return;
    }

    match result {
        Ok(_) => {
            info!(day = key.day, task = key.task.label(), value, "progress saved");
            shared.notify(Notice::Saved {
                day: key.day,
                task: key.task,
                completed: value,
            });
            shared.store.invalidate().await;

            if flags.is_complete() {
                info!(day = key.day, "day completed");
                shared.notify(Notice::DayCompleted { day: key.day });
                schedule_refresh(&shared, epoch).await;
            }
        }
        Err(err) => {
            warn!(day = key.day, error = %err, "progress update failed");
            report_failure(&shared, err);
        }
    }
}

// Failures are reported once and never retried.
fn report_failure<S>(shared: &Shared<S>, err: ClientError) {
    let notice = match err {
        ClientError::RateLimited => Notice::RateLimited {
            message: err.to_string(),
        },
        err => Notice::SaveFailed {
            message: err.save_message(),
        },
    };
    shared.notify(notice);
}

// Gives the backend time to compute the next unlock before refetching.
async fn schedule_refresh<S: ProgressStore>(shared: &Arc<Shared<S>>, epoch: u64) {
    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(task_shared.refresh_delay).await;
        if task_shared.is_current(epoch) {
            task_shared.store.invalidate().await;
        }
    });

    let mut followups = shared.followups.lock().await;
    followups.retain(|handle| !handle.is_finished());
    followups.push(handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeStore {
        available: std::sync::Mutex<Option<u8>>,
        days: std::sync::Mutex<HashMap<u8, TaskFlags>>,
        persisted: std::sync::Mutex<Vec<ProgressUpdate>>,
        invalidations: AtomicUsize,
        read_failure: Option<u16>,
        persist_failure: Option<u16>,
        persist_delay: Duration,
    }

    fn failure(status: u16) -> ClientError {
        match status {
            429 => ClientError::RateLimited,
            status => ClientError::Api {
                status,
                detail: "backend unavailable".into(),
            },
        }
    }

    impl FakeStore {
        fn on_day(day: u8) -> Self {
            let store = Self::default();
            *store.available.lock().unwrap() = Some(day);
            store
        }

        fn persisted(&self) -> Vec<ProgressUpdate> {
            self.persisted.lock().unwrap().clone()
        }

        fn invalidations(&self) -> usize {
            self.invalidations.load(Ordering::SeqCst)
        }
    }

    impl ProgressStore for FakeStore {
        async fn available_day(&self) -> Result<u8, ClientError> {
            self.available.lock().unwrap().ok_or(ClientError::AuthExpired)
        }

        async fn known_tasks(&self, day: u8) -> Result<Option<TaskFlags>, ClientError> {
            if let Some(status) = self.read_failure {
                return Err(failure(status));
            }
            Ok(self.days.lock().unwrap().get(&day).copied())
        }

        async fn persist(&self, update: ProgressUpdate) -> Result<ProgressRecord, ClientError> {
            self.persisted.lock().unwrap().push(update);
            if !self.persist_delay.is_zero() {
                tokio::time::sleep(self.persist_delay).await;
            }
            if let Some(status) = self.persist_failure {
                return Err(failure(status));
            }
            self.days.lock().unwrap().insert(update.day, update.flags());
            Ok(ProgressRecord {
                id: String::new(),
                user_id: String::new(),
                day: update.day,
                meditation_completed: update.meditation_completed,
                video_completed: update.video_completed,
                rosary_completed: update.rosary_completed,
                completed_at: None,
            })
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn coalescer(store: FakeStore) -> (Coalescer<FakeStore>, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coalescer = Coalescer::new(store, tx, DEFAULT_QUIET_PERIOD, DEFAULT_UNLOCK_REFRESH_DELAY);
        (coalescer, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_within_window_collapse_to_last_value() {
        let (coalescer, _rx) = coalescer(FakeStore::on_day(5));

        assert_eq!(coalescer.toggle(5, TaskName::Meditation, true).await.unwrap(), ToggleOutcome::Scheduled);
        wait(200).await;
        assert_eq!(coalescer.toggle(5, TaskName::Meditation, false).await.unwrap(), ToggleOutcome::Replaced);
        assert_eq!(coalescer.pending_count().await, 1);
        wait(600).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 1);
        assert!(!persisted[0].meditation_completed);
        assert_eq!(coalescer.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_past_window_persist_separately() {
        let (coalescer, _rx) = coalescer(FakeStore::on_day(5));

        coalescer.toggle(5, TaskName::Video, true).await.unwrap();
        wait(600).await;
        coalescer.toggle(5, TaskName::Video, false).await.unwrap();
        wait(600).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 2);
        assert!(persisted[0].video_completed);
        assert!(!persisted[1].video_completed);
    }

    #[tokio::test(start_paused = true)]
    async fn other_days_are_rejected() {
        let (coalescer, _rx) = coalescer(FakeStore::on_day(5));

        assert_eq!(coalescer.toggle(4, TaskName::Rosary, true).await.unwrap(), ToggleOutcome::Rejected);
        assert_eq!(coalescer.pending_count().await, 0);
        wait(1000).await;
        assert!(coalescer.store().persisted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn merge_keeps_unrelated_tasks() {
        let store = FakeStore::on_day(7);
        store.days.lock().unwrap().insert(
            7,
            TaskFlags { meditation: true, video: false, rosary: true },
        );
        let (coalescer, _rx) = coalescer(store);

        coalescer.toggle(7, TaskName::Rosary, false).await.unwrap();
        wait(600).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(
            persisted[0],
            ProgressUpdate {
                day: 7,
                meditation_completed: true,
                video_completed: false,
                rosary_completed: false,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completing_all_tasks_notifies_and_schedules_refresh() {
        let (coalescer, mut rx) = coalescer(FakeStore::on_day(5));

        coalescer.toggle(5, TaskName::Meditation, true).await.unwrap();
        wait(200).await;
        coalescer.toggle(5, TaskName::Video, true).await.unwrap();
        wait(200).await;
        coalescer.toggle(5, TaskName::Rosary, true).await.unwrap();
        wait(600).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 3);
        assert!(persisted[2].flags().is_complete());

        let notices = drain(&mut rx);
        assert!(notices.contains(&Notice::DayCompleted { day: 5 }));
        assert_eq!(
            notices.iter().filter(|n| matches!(n, Notice::Saved { .. })).count(),
            3
        );
        assert_eq!(coalescer.store().invalidations(), 3);

        wait(1100).await;
        assert_eq!(coalescer.store().invalidations(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_clears_entry_without_retry() {
        let store = FakeStore {
            persist_failure: Some(429),
            ..FakeStore::on_day(2)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(2, TaskName::Video, true).await.unwrap();
        wait(600).await;
        assert_eq!(coalescer.pending_count().await, 0);

        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(matches!(&notices[0], Notice::RateLimited { message } if message.contains("5 minutes")));

        wait(10_000).await;
        assert_eq!(coalescer.store().persisted().len(), 1);
        assert_eq!(coalescer.store().invalidations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_reports_once_without_retry() {
        let store = FakeStore {
            persist_failure: Some(500),
            ..FakeStore::on_day(4)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(4, TaskName::Meditation, true).await.unwrap();
        wait(600).await;
        assert_eq!(coalescer.pending_count().await, 0);
        assert_eq!(
            drain(&mut rx),
            vec![Notice::SaveFailed { message: "Failed to save progress".into() }]
        );

        wait(10_000).await;
        assert_eq!(coalescer.store().persisted().len(), 1);
        assert_eq!(coalescer.store().invalidations(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_progress_is_not_overwritten() {
        let store = FakeStore {
            read_failure: Some(503),
            ..FakeStore::on_day(5)
        };
        store.days.lock().unwrap().insert(
            5,
            TaskFlags { meditation: true, video: true, rosary: false },
        );
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(5, TaskName::Rosary, true).await.unwrap();
        wait(600).await;

        assert!(coalescer.store().persisted().is_empty());
        assert_eq!(coalescer.pending_count().await, 0);
        assert!(matches!(drain(&mut rx).as_slice(), [Notice::SaveFailed { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_read_reports_rate_limit() {
        let store = FakeStore {
            read_failure: Some(429),
            ..FakeStore::on_day(5)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(5, TaskName::Video, true).await.unwrap();
        wait(600).await;

        assert!(coalescer.store().persisted().is_empty());
        assert!(matches!(drain(&mut rx).as_slice(), [Notice::RateLimited { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_saves_still_merge_earlier_tasks() {
        let store = FakeStore {
            persist_delay: Duration::from_millis(300),
            ..FakeStore::on_day(5)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(5, TaskName::Meditation, true).await.unwrap();
        wait(200).await;
        coalescer.toggle(5, TaskName::Video, true).await.unwrap();
        wait(200).await;
        coalescer.toggle(5, TaskName::Rosary, true).await.unwrap();
        wait(2000).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted[1].flags(), TaskFlags { meditation: true, video: true, rosary: false });
        assert!(persisted[2].flags().is_complete());
        assert!(coalescer.store().days.lock().unwrap()[&5].is_complete());
        assert!(drain(&mut rx).contains(&Notice::DayCompleted { day: 5 }));
    }

    #[tokio::test]
    async fn unknown_available_day_is_an_error() {
        let (coalescer, _rx) = coalescer(FakeStore::default());

        let result = coalescer.toggle(1, TaskName::Video, true).await;
        assert!(matches!(result, Err(ClientError::AuthExpired)));
        assert_eq!(coalescer.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timers() {
        let (coalescer, mut rx) = coalescer(FakeStore::on_day(3));

        coalescer.toggle(3, TaskName::Meditation, true).await.unwrap();
        coalescer.toggle(3, TaskName::Video, true).await.unwrap();
        assert_eq!(coalescer.pending_count().await, 2);
        coalescer.shutdown().await;
        assert_eq!(coalescer.pending_count().await, 0);

        wait(1000).await;
        assert!(coalescer.store().persisted().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_toggle_does_not_cancel_in_flight_call() {
        let store = FakeStore {
            persist_delay: Duration::from_millis(1000),
            ..FakeStore::on_day(9)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(9, TaskName::Rosary, true).await.unwrap();
        wait(600).await;
        assert_eq!(coalescer.toggle(9, TaskName::Rosary, false).await.unwrap(), ToggleOutcome::Scheduled);
        wait(2000).await;

        let persisted = coalescer.store().persisted();
        assert_eq!(persisted.len(), 2);
        assert!(persisted[0].rosary_completed);
        assert!(!persisted[1].rosary_completed);
        assert_eq!(
            drain(&mut rx).iter().filter(|n| matches!(n, Notice::Saved { .. })).count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_result_is_silent_after_shutdown() {
        let store = FakeStore {
            persist_delay: Duration::from_millis(1000),
            ..FakeStore::on_day(9)
        };
        let (coalescer, mut rx) = coalescer(store);

        coalescer.toggle(9, TaskName::Video, true).await.unwrap();
        wait(600).await;
        coalescer.shutdown().await;
        wait(2000).await;

        assert_eq!(coalescer.store().persisted().len(), 1);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(coalescer.store().invalidations(), 0);
    }
}
