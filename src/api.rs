//! HTTP client for the consecration backend.
//!
//! Authenticated calls carry the session's bearer token. A 401 triggers one
//! refresh attempt followed by one retry; if that does not succeed the
//! session is ended and [`ClientError::AuthExpired`] is returned.

use crate::errors::ClientError;
use crate::models::{
    DashboardData, DeleteAccountResponse, LoginRequest, LoginResponse,
    ProgressRecord, ProgressUpdate, RegisterRequest, TokenPair, UserResponse,
};
use crate::session::SessionStore;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, session: SessionStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(form)
            .send()
            .await?;
        parse(response).await
    }

    /// Exchanges the refresh token for a new token pair.
    ///
    /// Returns `false` when there is no refresh token or the backend refuses it.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        let Some(refresh_token) = self.session.refresh_token().await else {
            return Ok(false);
        };

        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .bearer_auth(refresh_token)
            .send()
            .await?;
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "token refresh refused");
            return Ok(false);
        }

        let tokens: TokenPair = response.json().await?;
        self.session.replace_tokens(tokens).await;
        debug!("access token refreshed");
        Ok(true)
    }

    pub async fn update_profile(&self, name: &str) -> Result<UserResponse, ClientError> {
        let body = json!({ "name": name });
        self.authorized(Method::PUT, "/users/profile", Some(&body)).await
    }

    pub async fn update_progress(&self, update: &ProgressUpdate) -> Result<ProgressRecord, ClientError> {
        let body = serde_json::to_value(update).map_err(|err| ClientError::invalid(err.to_string()))?;
        self.authorized(Method::POST, "/users/progress", Some(&body)).await
    }

    pub async fn dashboard(&self) -> Result<DashboardData, ClientError> {
        self.authorized(Method::GET, "/users/dashboard", None).await
    }

    pub async fn set_libre_mode(&self, libre_mode: bool) -> Result<UserResponse, ClientError> {
        let body = json!({ "libre_mode": libre_mode });
        self.authorized(Method::PUT, "/users/libre-mode", Some(&body)).await
    }

    pub async fn set_start_day(&self, start_day: u8) -> Result<UserResponse, ClientError> {
        let body = json!({ "start_day": start_day });
        self.authorized(Method::POST, "/users/set-start-day", Some(&body)).await
    }

    pub async fn delete_account(&self) -> Result<DeleteAccountResponse, ClientError> {
        self.authorized(Method::DELETE, "/users/account", None).await
    }

    async fn authorized<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let token = self.session.access_token().await.ok_or(ClientError::NotSignedIn)?;
        let response = self.send(method.clone(), path, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return parse(response).await;
        }

        debug!(path, "access token rejected, attempting refresh");
        let refreshed = match self.refresh().await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                false
            }
        };
        let token = match self.session.access_token().await {
            Some(token) if refreshed => token,
            _ => {
                self.session.end().await;
                return Err(ClientError::AuthExpired);
            }
        };

        let response = self.send(method, path, body, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.end().await;
            return Err(ClientError::AuthExpired);
        }
        parse(response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ClientError::RateLimited);
    }

    let detail = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}
