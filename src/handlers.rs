use crate::actions::{self, DashboardView};
use crate::coalescer::ToggleOutcome;
use crate::errors::{AppError, ClientError};
use crate::models::{
    DeleteAccountRequest, LibreModeRequest, LoginRequest, ProfileRequest, RegisterForm,
    StartDayRequest, ToggleRequest, ToggleResponse, UserResponse,
};
use crate::notify::NoticeView;
use crate::state::AppState;
use crate::ui::{render_calendar, render_dashboard, render_signed_out};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::warn;

pub async fn index(State(state): State<AppState>) -> Response {
    match actions::dashboard(&state, Utc::now()).await {
        Ok(view) => Html(render_dashboard(&view)).into_response(),
        Err(err) => signed_out_or_error(err),
    }
}

pub async fn calendar(State(state): State<AppState>) -> Response {
    match actions::dashboard(&state, Utc::now()).await {
        Ok(view) => Html(render_calendar(&view)).into_response(),
        Err(ClientError::NotSignedIn | ClientError::AuthExpired) => Redirect::to("/").into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

fn signed_out_or_error(err: ClientError) -> Response {
    match err {
        ClientError::NotSignedIn | ClientError::AuthExpired => {
            Html(render_signed_out()).into_response()
        }
        err => {
            warn!(error = %err, "failed to load dashboard");
            AppError::from(err).into_response()
        }
    }
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(actions::login(&state, payload).await?))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterForm>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(actions::register(&state, payload).await?))
}

pub async fn logout(State(state): State<AppState>) -> StatusCode {
    actions::logout(&state).await;
    StatusCode::NO_CONTENT
}

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardView>, AppError> {
    Ok(Json(actions::dashboard(&state, Utc::now()).await?))
}

pub async fn toggle(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<(StatusCode, Json<ToggleResponse>), AppError> {
    let outcome = actions::toggle_task(&state, payload.day, payload.task, payload.completed).await?;
    let status = match outcome {
        ToggleOutcome::Rejected => StatusCode::CONFLICT,
        _ => StatusCode::ACCEPTED,
    };
    Ok((
        status,
        Json(ToggleResponse {
            outcome: outcome.as_str().to_string(),
            pending: state.coalescer.pending_count().await,
        }),
    ))
}

pub async fn libre_mode(
    State(state): State<AppState>,
    Json(payload): Json<LibreModeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(actions::set_libre_mode(&state, payload.libre_mode).await?))
}

pub async fn start_day(
    State(state): State<AppState>,
    Json(payload): Json<StartDayRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(actions::set_start_day(&state, payload.start_day).await?))
}

pub async fn profile(
    State(state): State<AppState>,
    Json(payload): Json<ProfileRequest>,
) -> Result<Response, AppError> {
    match actions::update_name(&state, &payload.name).await? {
        Some(user) => Ok(Json(user).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn delete_account(
    State(state): State<AppState>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<StatusCode, AppError> {
    actions::delete_account(&state, &payload.confirmation).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn notifications(State(state): State<AppState>) -> Json<Vec<NoticeView>> {
    Json(state.notices.visible().await)
}
