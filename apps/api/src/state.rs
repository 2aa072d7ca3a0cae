use crate::ai_client::AiClient;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Orchestration facade. Owns the text generator and the response cache.
    pub ai: AiClient,
    pub config: Config,
}
