//! Session and account operations behind the front end.

use crate::availability::{AvailabilityInput, DayState, Resolution, resolve};
use crate::coalescer::ToggleOutcome;
use crate::countdown::format_remaining;
use crate::errors::ClientError;
use crate::models::{
    DashboardData, LoginRequest, RegisterForm, RegisterRequest, TaskFlags, TaskName,
    UserResponse, is_valid_day,
};
use crate::state::AppState;
use crate::stats::{ProgressSummary, summarize};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const DELETE_CONFIRMATION: &str = "Totus Tuus";

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub user: UserResponse,
    pub available_day: u8,
    pub today: TaskFlags,
    pub day_states: Vec<DayState>,
    pub countdown: Option<String>,
    pub countdown_secs: Option<i64>,
    pub summary: ProgressSummary,
    pub can_choose_start_day: bool,
    pub daily_content: serde_json::Value,
}

pub async fn login(state: &AppState, credentials: LoginRequest) -> Result<UserResponse, ClientError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ClientError::invalid("email and password are required"));
    }
    let response = state.api.login(&credentials).await?;
    Ok(start_session(state, response).await)
}

pub async fn register(state: &AppState, form: RegisterForm) -> Result<UserResponse, ClientError> {
    let name = form.name.trim();
    let email = form.email.trim();
    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(ClientError::invalid("name, email and password are required"));
    }
    if form.password != form.confirm_password {
        return Err(ClientError::invalid("passwords do not match"));
    }

    let request = RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: form.password,
    };
    let response = state.api.register(&request).await?;
    Ok(start_session(state, response).await)
}

async fn start_session(state: &AppState, response: crate::models::LoginResponse) -> UserResponse {
    // Timers from a previous session must not fire against the new one.
    state.coalescer.shutdown().await;
    state.disarm_unlock_watch().await;
    state.cache.invalidate().await;
    state.session().begin(response).await.user
}

pub async fn logout(state: &AppState) {
    state.end_session().await;
}

pub async fn dashboard(state: &AppState, now: DateTime<Utc>) -> Result<DashboardView, ClientError> {
    let (data, resolution) = fetch_resolved(state, now).await?;

    match resolution.countdown {
        Some(remaining) => state.arm_unlock_watch(remaining).await,
        None => state.disarm_unlock_watch().await,
    }

    let today = data
        .day(resolution.available_day)
        .map(|entry| entry.flags())
        .unwrap_or_default();
    Ok(DashboardView {
        can_choose_start_day: !data.user.has_chosen_start_day,
        available_day: resolution.available_day,
        today,
        countdown: resolution.countdown.map(format_remaining),
        countdown_secs: resolution.countdown.map(|remaining| remaining.num_seconds()),
        summary: summarize(&data.progress),
        day_states: resolution.day_states,
        daily_content: data.daily_content,
        user: data.user,
    })
}

// Refetches once when the resolver cannot trust the cached dashboard.
async fn fetch_resolved(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<(DashboardData, Resolution), ClientError> {
    let data = state.cache.get(&state.api).await?;
    match resolve(&AvailabilityInput::from_dashboard(&data, now)) {
        Ok(resolution) if !resolution.refresh_requested => return Ok((data, resolution)),
        Ok(_) => debug!("unlock time passed, refetching dashboard"),
        Err(ClientError::DataInconsistency { day }) => {
            warn!(day, "dashboard has no progress for the available day, refetching")
        }
        Err(err) => return Err(err),
    }

    state.cache.invalidate().await;
    let data = state.cache.get(&state.api).await?;
    let resolution = resolve(&AvailabilityInput::from_dashboard(&data, now))?;
    Ok((data, resolution))
}

pub async fn toggle_task(
    state: &AppState,
    day: u8,
    task: TaskName,
    completed: bool,
) -> Result<ToggleOutcome, ClientError> {
    if !state.session().is_active().await {
        return Err(ClientError::NotSignedIn);
    }
    state.coalescer.toggle(day, task, completed).await
}

/// Picks the program's start day. Allowed once per account.
pub async fn set_start_day(state: &AppState, start_day: u8) -> Result<UserResponse, ClientError> {
    if !is_valid_day(start_day) {
        return Err(ClientError::invalid("start day must be between 1 and 33"));
    }

    let data = state.cache.get(&state.api).await?;
    let already_chosen = data.user.has_chosen_start_day
        || state
            .session()
            .user()
            .await
            .is_some_and(|user| user.has_chosen_start_day);
    if already_chosen {
        return Err(ClientError::StartDayAlreadyChosen);
    }

    let user = state.api.set_start_day(start_day).await?;
    info!(start_day, "start day chosen");
    apply_user(state, user).await
}

pub async fn set_libre_mode(state: &AppState, libre_mode: bool) -> Result<UserResponse, ClientError> {
    let user = state.api.set_libre_mode(libre_mode).await?;
    info!(libre_mode, "libre mode updated");
    apply_user(state, user).await
}

/// Renames the user; blank or unchanged names are ignored.
pub async fn update_name(state: &AppState, name: &str) -> Result<Option<UserResponse>, ClientError> {
    let current = state.session().user().await.ok_or(ClientError::NotSignedIn)?;
    let name = name.trim();
    if name.is_empty() || name == current.name {
        return Ok(None);
    }

    let user = state.api.update_profile(name).await?;
    apply_user(state, user).await.map(Some)
}

pub async fn delete_account(state: &AppState, confirmation: &str) -> Result<(), ClientError> {
    if confirmation != DELETE_CONFIRMATION {
        return Err(ClientError::invalid(format!(
            "type \"{DELETE_CONFIRMATION}\" to confirm"
        )));
    }

    let response = state.api.delete_account().await?;
    info!(deleted = response.deleted, "account deleted");
    state.end_session().await;
    Ok(())
}

async fn apply_user(state: &AppState, user: UserResponse) -> Result<UserResponse, ClientError> {
    state.session().update_user(user.clone()).await;
    state.cache.invalidate().await;
    Ok(user)
}
