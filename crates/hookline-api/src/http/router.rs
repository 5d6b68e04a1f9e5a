//! Axum router configuration with middleware.
//!
//! All job and tool routes are under `/api/v1/` and require the API key.
//! `/health` is open. Middleware: CORS, request tracing.

use axum::Router;
use axum::extract::Request;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hookline_observe::job_attrs::SPAN_HTTP_REQUEST;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tools
        .route("/tools", get(handlers::tools::list_tools))
        .route("/tools/{name}", post(handlers::tools::start_tool))
        // Jobs
        .route(
            "/jobs",
            get(handlers::jobs::list_jobs).delete(handlers::jobs::clear_jobs),
        )
        .route("/jobs/expire", post(handlers::jobs::expire_jobs))
        .route("/jobs/purge", post(handlers::jobs::purge_jobs))
        .route(
            "/jobs/{id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
        )
        .route("/jobs/{id}/cancel", post(handlers::jobs::cancel_job));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            SPAN_HTTP_REQUEST,
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(trace)
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
