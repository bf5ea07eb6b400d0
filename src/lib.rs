pub mod actions;
pub mod api;
pub mod app;
pub mod availability;
pub mod cache;
pub mod coalescer;
pub mod config;
pub mod countdown;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use session::SessionStore;
pub use state::AppState;
