// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, grading},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges the grading and attempt sub-routers.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (grading store).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let grading_routes = Router::new()
        .route("/queue", get(grading::grading_queue))
        .route("/attempts/{id}", get(grading::get_attempt))
        .route("/update-score", post(grading::update_score))
        .route("/complete", post(grading::complete_grading));

    let attempt_routes = Router::new()
        .route("/api/exams/{id}/attempts", post(attempts::start_attempt))
        .route("/api/attempts/{id}/submit", post(attempts::submit_attempt));

    Router::new()
        .nest("/api/grading", grading_routes)
        .merge(attempt_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
