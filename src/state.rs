use crate::api::ApiClient;
use crate::cache::DashboardCache;
use crate::coalescer::{Coalescer, ProgressStore};
use crate::config::Config;
use crate::countdown::UnlockWatch;
use crate::errors::ClientError;
use crate::models::{ProgressRecord, ProgressUpdate, TaskFlags};
use crate::notify::NoticeBoard;
use crate::session::SessionStore;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: ApiClient,
    pub cache: DashboardCache,
    pub coalescer: Coalescer<BackendStore>,
    pub notices: NoticeBoard,
    unlock_watch: Arc<Mutex<Option<UnlockWatch>>>,
}

impl AppState {
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, session: SessionStore) -> Self {
        let api = ApiClient::new(config.api_base_url.clone(), session);
        let cache = DashboardCache::new(config.dashboard_stale_after);

        let (tx, rx) = mpsc::unbounded_channel();
        let notices = NoticeBoard::new();
        notices.collect(rx);

        let store = BackendStore {
            api: api.clone(),
            cache: cache.clone(),
        };
        let coalescer = Coalescer::new(store, tx, config.debounce, config.unlock_refresh_delay);

        Self {
            config: Arc::new(config),
            api,
            cache,
            coalescer,
            notices,
            unlock_watch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Starts (or restarts) the ticker that refetches once the next day unlocks.
    pub async fn arm_unlock_watch(&self, remaining: chrono::Duration) {
        let cache = self.cache.clone();
        let watch = UnlockWatch::start(remaining, move || async move {
            info!("next day unlocked, invalidating dashboard");
            cache.invalidate().await;
        });
        *self.unlock_watch.lock().await = Some(watch);
    }

    pub async fn disarm_unlock_watch(&self) {
        if self.unlock_watch.lock().await.take().is_some() {
            debug!("unlock watch stopped");
        }
    }

    pub async fn unlock_watch_armed(&self) -> bool {
        self.unlock_watch
            .lock()
            .await
            .as_ref()
            .is_some_and(|watch| !watch.is_finished())
    }

    /// Tears down everything tied to the current session.
    pub async fn end_session(&self) {
        self.coalescer.shutdown().await;
        self.disarm_unlock_watch().await;
        self.cache.invalidate().await;
        self.session().end().await;
    }
}

/// Backs the coalescer with the remote API and the dashboard cache.
#[derive(Clone)]
pub struct BackendStore {
    api: ApiClient,
    cache: DashboardCache,
}

impl ProgressStore for BackendStore {
    async fn available_day(&self) -> Result<u8, ClientError> {
        Ok(self.cache.get(&self.api).await?.available_day)
    }

    async fn known_tasks(&self, day: u8) -> Result<Option<TaskFlags>, ClientError> {
        let data = self.cache.get(&self.api).await?;
        Ok(data.day(day).map(|entry| entry.flags()))
    }

    async fn persist(&self, update: ProgressUpdate) -> Result<ProgressRecord, ClientError> {
        self.api.update_progress(&update).await
    }

    async fn invalidate(&self) {
        self.cache.invalidate().await;
    }
}
