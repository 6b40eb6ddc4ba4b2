use std::sync::Arc;

use storyweaver_core::config::StoryConfig;
use storyweaver_genai::GenerationBackend;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: storyweaver_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-role model identifiers and sampling parameters.
    pub story: Arc<StoryConfig>,
    /// Generation backend. Production wires `GenAiClient`; tests substitute
    /// scripted implementations.
    pub backend: Arc<dyn GenerationBackend>,
}
