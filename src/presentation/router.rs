use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::presentation::handlers::{
    health_handler, job_errors_handler, job_status_handler, upload_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Uploads are streamed to disk, so the default 2 MB body cap does not apply.
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/v1/uploads",
            post(upload_handler).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/v1/jobs/{job_id}", get(job_status_handler))
        .route("/api/v1/jobs/{job_id}/errors", get(job_errors_handler))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
