use crate::api::ApiClient;
use crate::errors::ClientError;
use crate::models::DashboardData;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

struct Cached {
    user_id: String,
    fetched_at: Instant,
    data: DashboardData,
}

#[derive(Default)]
struct Slot {
    entry: Option<Cached>,
    generation: u64,
}

/// Last dashboard fetched for the signed-in user.
///
/// Entries are replaced wholesale, never edited. A fetch that races with an
/// invalidation is returned to its caller but not stored.
#[derive(Clone)]
pub struct DashboardCache {
    slot: Arc<Mutex<Slot>>,
    stale_after: Duration,
}

impl DashboardCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            stale_after,
        }
    }

    pub async fn get(&self, api: &ApiClient) -> Result<DashboardData, ClientError> {
        let user_id = api
            .session()
            .user()
            .await
            .map(|user| user.id)
            .ok_or(ClientError::NotSignedIn)?;
        self.get_with(&user_id, || api.dashboard()).await
    }

    pub async fn get_with<F, Fut>(&self, user_id: &str, fetch: F) -> Result<DashboardData, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DashboardData, ClientError>>,
    {
        let generation = {
            let slot = self.slot.lock().await;
            if let Some(cached) = &slot.entry {
                if cached.user_id == user_id && cached.fetched_at.elapsed() < self.stale_after {
                    return Ok(cached.data.clone());
                }
            }
            slot.generation
        };

        debug!(user_id, "fetching dashboard");
        let data = fetch().await?;

        let mut slot = self.slot.lock().await;
        if slot.generation == generation {
            slot.entry = Some(Cached {
                user_id: user_id.to_string(),
                fetched_at: Instant::now(),
                data: data.clone(),
            });
        }
        Ok(data)
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        slot.entry = None;
        slot.generation += 1;
    }
}
