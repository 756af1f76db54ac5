pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/generate-meme", post(handlers::handle_generate_meme))
        .route("/templates", get(handlers::handle_list_templates))
        .with_state(state)
}
