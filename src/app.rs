use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/calendar", get(handlers::calendar))
        .route("/healthz", get(handlers::healthz))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/progress/toggle", post(handlers::toggle))
        .route("/api/libre-mode", put(handlers::libre_mode))
        .route("/api/start-day", post(handlers::start_day))
        .route("/api/profile", put(handlers::profile))
        .route("/api/account", delete(handlers::delete_account))
        .route("/api/notifications", get(handlers::notifications))
        .with_state(state)
}
