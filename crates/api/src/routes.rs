use axum::{
    routing::{get, post},
    Router,
};
use crate::{AppState, handlers::*};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/ocr", post(ocr))
        .route("/languages", get(languages))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
}

pub fn build_router(state: AppState) -> Router {
    create_router().with_state(state)
}
