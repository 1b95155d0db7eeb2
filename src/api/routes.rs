use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

async fn health_check() -> &'static str {
    "ok"
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/command", post(handlers::submit_command))
        .route("/api/command/confirm", post(handlers::confirm_command))
        .route("/api/command/select", post(handlers::select_command))
        .route("/api/undo", post(handlers::undo))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
