pub mod handlers;
pub mod intake;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use handlers::*;
pub use intake::*;
pub use middleware::*;
pub use response::*;
pub use routes::*;
pub use state::*;

use axum::Router;
use std::future::Future;
use tracing::info;

/// Router with all routes, state and middleware applied.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_request_body_bytes();
    apply_middleware(build_router(state), body_limit)
}

pub async fn start_server<F>(
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind = state.config.server.bind.clone();
    let port = state.config.server.port;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
    info!("OCR API server listening on {}:{}", bind, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
