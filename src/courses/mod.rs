pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router(state: &AppState) -> Router<AppState> {
    handlers::course_routes(state)
}
