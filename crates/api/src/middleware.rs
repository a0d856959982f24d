use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

pub fn apply_middleware(router: Router, body_limit_bytes: usize) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(body_limit_bytes)),
    )
}

// Access logging is handled by TraceLayer
