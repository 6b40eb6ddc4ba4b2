pub mod health;
pub mod story;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /stories                                  start a story (POST)
/// /stories/{id}                             full session document (GET)
/// /stories/{id}/turns                       submit a choice (POST)
/// /stories/{id}/images/{round}              poll image status (GET)
/// /stories/{id}/images/{round}/retry        re-run image generation (POST)
///
/// /users/{user_id}/stories                  session summaries (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/stories", story::router())
        .route("/users/{user_id}/stories", get(handlers::story::list_for_user))
}
