use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filter;
pub mod handlers;
pub mod link_type;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    handlers::link_routes()
}
