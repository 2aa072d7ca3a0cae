pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ai_client::handlers;
use crate::state::AppState;
use crate::validators::MAX_AUDIO_BYTES;

/// Headroom over the audio limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Experience workflow
        .route(
            "/api/v1/experience/init",
            post(handlers::handle_experience_init),
        )
        .route(
            "/api/v1/experience/refine",
            post(handlers::handle_experience_refine),
        )
        .route(
            "/api/v1/experience/finalize",
            post(handlers::handle_experience_finalize),
        )
        .route(
            "/api/v1/experience/transcribe",
            post(handlers::handle_transcribe)
                .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        // Operator cache controls
        .route(
            "/api/v1/ai/cache",
            get(handlers::handle_cache_stats).delete(handlers::handle_cache_clear),
        )
        .with_state(state)
}
