//! The signed-in user's tokens and profile snapshot.
//!
//! One context per process. It is created on login or registration, updated
//! when tokens are refreshed, and torn down on logout, refresh failure, or
//! account deletion. The JSON file behind it lets a restart resume the
//! session.

use crate::models::{LoginResponse, TokenPair, UserResponse};
use crate::storage::{load_session, persist_session, remove_session};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    current: Arc<Mutex<Option<Session>>>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Loads a previously persisted session, if any.
    pub async fn restore(path: PathBuf) -> Self {
        let session = load_session(&path).await;
        if let Some(session) = &session {
            info!(user = %session.user.email, "restored session");
        }
        Self {
            path,
            current: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn begin(&self, login: LoginResponse) -> Session {
        let session = Session {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            token_type: login.token_type,
            user: login.user,
        };
        *self.current.lock().await = Some(session.clone());
        self.save(&session).await;
        info!(user = %session.user.email, "session started");
        session
    }

    pub async fn is_active(&self) -> bool {
        self.current.lock().await.is_some()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current.lock().await.as_ref().map(|s| s.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.current.lock().await.as_ref().map(|s| s.refresh_token.clone())
    }

    pub async fn user(&self) -> Option<UserResponse> {
        self.current.lock().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn replace_tokens(&self, tokens: TokenPair) {
        let snapshot = {
            let mut current = self.current.lock().await;
            let Some(session) = current.as_mut() else {
                return;
            };
            session.access_token = tokens.access_token;
            session.refresh_token = tokens.refresh_token;
            session.clone()
        };
        self.save(&snapshot).await;
    }

    /// Merges a fresh user snapshot returned by a profile mutation.
    pub async fn update_user(&self, user: UserResponse) {
        let snapshot = {
            let mut current = self.current.lock().await;
            let Some(session) = current.as_mut() else {
                return;
            };
            session.user = user;
            session.clone()
        };
        self.save(&snapshot).await;
    }

    pub async fn end(&self) {
        let previous = self.current.lock().await.take();
        if let Err(err) = remove_session(&self.path).await {
            warn!("failed to remove session file: {err}");
        }
        if let Some(session) = previous {
            info!(user = %session.user.email, "session ended");
        }
    }

    async fn save(&self, session: &Session) {
        if let Err(err) = persist_session(&self.path, session).await {
            warn!("failed to persist session: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserResponse {
        UserResponse {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            current_day: 1,
            start_day: 1,
            has_chosen_start_day: false,
            libre_mode: false,
            is_active: true,
        }
    }

    fn login() -> LoginResponse {
        LoginResponse {
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            token_type: "bearer".into(),
            user: user(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("totus_tuus_{name}_{}_{}.json", std::process::id(), nanos));
        path
    }

    #[tokio::test]
    async fn session_survives_restart_until_ended() {
        let path = temp_path("restore");
        let store = SessionStore::new(path.clone());
        store.begin(login()).await;
        store
            .replace_tokens(TokenPair {
                access_token: "access-2".into(),
                refresh_token: "refresh-2".into(),
            })
            .await;

        let restored = SessionStore::restore(path.clone()).await;
        assert_eq!(restored.access_token().await.as_deref(), Some("access-2"));
        assert_eq!(restored.refresh_token().await.as_deref(), Some("refresh-2"));

        restored.end().await;
        assert!(!restored.is_active().await);
        assert!(!path.exists());
        assert!(!SessionStore::restore(path).await.is_active().await);
    }

    #[tokio::test]
    async fn token_replacement_without_session_is_ignored() {
        let store = SessionStore::new(temp_path("empty"));
        store
            .replace_tokens(TokenPair {
                access_token: "a".into(),
                refresh_token: "r".into(),
            })
            .await;
        assert!(!store.is_active().await);
    }
}
