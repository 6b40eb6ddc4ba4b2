//! Route definitions for the `/stories` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::story;
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// POST /                          -> start
/// GET  /{id}                      -> get_session
/// POST /{id}/turns                -> submit_choice
/// GET  /{id}/images/{round}       -> image_status
/// POST /{id}/images/{round}/retry -> retry_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(story::start))
        .route("/{id}", get(story::get_session))
        .route("/{id}/turns", post(story::submit_choice))
        .route("/{id}/images/{round}", get(story::image_status))
        .route("/{id}/images/{round}/retry", post(story::retry_image))
}
