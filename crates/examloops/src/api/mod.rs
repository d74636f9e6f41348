mod questions;
mod response;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use examloops_core::ExamVerifier;

pub use response::{ApiError, Envelope};

#[derive(Clone)]
pub struct AppState {
    pub verifier: ExamVerifier,
}

pub fn create_router(verifier: ExamVerifier) -> Router {
    let state = AppState { verifier };

    Router::new()
        .route("/", get(questions::root))
        .route("/health", get(questions::health))
        .route("/api/v1/verify", post(questions::verify))
        .route("/api/v1/fix", post(questions::fix))
        .route("/api/v1/verify-and-fix", post(questions::verify_and_fix))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
