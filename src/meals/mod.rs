pub mod dto;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_routes()
}
