//! # mb-api
//!
//! The web routing and orchestration layer for the message board.

pub mod extract;
pub mod handlers;
pub mod middleware;

use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

use handlers::AppState;

/// Builds the application router.
///
/// `public_dir`, when given, serves a static front-end for every path the
/// API does not claim (e.g. the `/b/{board}/` landing pages redirects point at).
pub fn create_router(state: Arc<AppState>, public_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route(
            "/api/threads/{board}",
            get(handlers::list_threads)
                .post(handlers::create_thread)
                .put(handlers::report_thread)
                .delete(handlers::delete_thread),
        )
        .route(
            "/api/replies/{board}",
            get(handlers::view_thread)
                .post(handlers::create_reply)
                .put(handlers::report_reply)
                .delete(handlers::delete_reply),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let router = match public_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    router.layer(
        ServiceBuilder::new()
            .layer(middleware::standard_middleware())
            .layer(middleware::cors_policy())
            .layer(axum::middleware::from_fn(middleware::security_headers)),
    )
}
