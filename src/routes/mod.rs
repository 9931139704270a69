//! Session-guarded views backing the dashboard and profile pages.

use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dashboard;
pub mod profile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/profile", get(profile::profile))
}
