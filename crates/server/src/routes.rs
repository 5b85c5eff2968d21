use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;

use common::types::Health;

use crate::observability::encode_metrics;

pub mod auth;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (axum::http::StatusCode, String) {
    encode_metrics()
}

/// Build the mock API router: health, metrics and the `/api/auth/*` endpoints
pub fn build_router(state: auth::ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    let auth_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/signup", post(auth::signup))
        .with_state(state);

    public
        .merge(auth_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
