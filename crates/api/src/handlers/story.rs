//! Handlers for the `/stories` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use storyweaver_core::error::CoreError;
use storyweaver_core::types::{Round, SessionId};
use storyweaver_core::validate;
use storyweaver_db::models::session::{PendingImageStatus, SessionSummary, StorySession, Turn};
use storyweaver_db::repositories::SessionRepo;

use crate::engine::{image_pipeline, orchestrator};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartStoryRequest {
    pub user_id: String,
    pub protagonist_name: String,
    pub protagonist_description: String,
    pub theme: String,
}

#[derive(Debug, Serialize)]
pub struct StartStoryResponse {
    pub session_id: SessionId,
    pub turn: Turn,
}

#[derive(Debug, Deserialize)]
pub struct SubmitChoiceRequest {
    pub choice_text: String,
}

/// Poll result for one round's illustration.
#[derive(Debug, Serialize)]
pub struct ImageStatus {
    pub status: &'static str,
    pub round: Round,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/stories
///
/// Fully synchronous, including the round-1 image: the opening response
/// arrives complete (the image may still be null after a recorded failure).
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<StartStoryRequest>,
) -> AppResult<Json<DataResponse<StartStoryResponse>>> {
    validate::validate_protagonist_name(&input.protagonist_name)?;
    validate::validate_protagonist_description(&input.protagonist_description)?;
    validate::validate_theme(&input.theme)?;
    if input.user_id.trim().is_empty() {
        return Err(CoreError::Validation("user_id must not be empty".to_string()).into());
    }

    let session = orchestrator::start_story(
        &state,
        orchestrator::NewStory {
            user_id: input.user_id,
            protagonist_name: input.protagonist_name,
            protagonist_description: input.protagonist_description,
            theme: input.theme,
        },
    )
    .await?;

    let turn = session
        .turns
        .0
        .last()
        .cloned()
        .ok_or_else(|| AppError::InternalError("created session has no turns".to_string()))?;

    Ok(Json(DataResponse {
        data: StartStoryResponse {
            session_id: session.id,
            turn,
        },
    }))
}

/// POST /api/v1/stories/{id}/turns
///
/// Validation runs before any generation call — a malformed choice must not
/// cost a backend round trip.
pub async fn submit_choice(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(input): Json<SubmitChoiceRequest>,
) -> AppResult<Json<DataResponse<Turn>>> {
    validate::validate_choice_text(&input.choice_text)?;

    let turn = orchestrator::submit_choice(&state, id, input.choice_text.trim()).await?;
    Ok(Json(DataResponse { data: turn }))
}

/// GET /api/v1/stories/{id}
///
/// Returns the full session document. Reading a legacy session migrates it
/// first, so clients only ever see structured turns.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> AppResult<Json<DataResponse<StorySession>>> {
    let session = SessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::SessionNotFound { id })?;
    Ok(Json(DataResponse { data: session }))
}

/// GET /api/v1/stories/{id}/images/{round}
pub async fn image_status(
    State(state): State<AppState>,
    Path((id, round)): Path<(SessionId, Round)>,
) -> AppResult<Json<DataResponse<ImageStatus>>> {
    let session = SessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::SessionNotFound { id })?;
    Ok(Json(DataResponse {
        data: image_status_for(&session, round),
    }))
}

/// POST /api/v1/stories/{id}/images/{round}/retry
///
/// Re-runs the image pipeline for an existing round. The response is
/// immediate; the outcome arrives through polling like any other image.
pub async fn retry_image(
    State(state): State<AppState>,
    Path((id, round)): Path<(SessionId, Round)>,
) -> AppResult<(StatusCode, Json<DataResponse<ImageStatus>>)> {
    let session = SessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::SessionNotFound { id })?;

    if round < 1 || round > session.round {
        return Err(CoreError::Validation(format!("round {round} has no turn")).into());
    }

    // The pending slot is marked `generating` before the 202 goes out, so a
    // poll racing the response never reads a stale failure.
    image_pipeline::dispatch(&state, id, round).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: ImageStatus {
                status: "generating",
                round,
                image_url: None,
                error: None,
            },
        }),
    ))
}

/// GET /api/v1/users/{user_id}/stories
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<SessionSummary>>>> {
    let summaries = SessionRepo::list_for_user(&state.pool, &user_id).await?;
    Ok(Json(DataResponse { data: summaries }))
}

// ---------------------------------------------------------------------------
// Image status resolution
// ---------------------------------------------------------------------------

/// Resolve the image status for one round.
///
/// The turn record is consulted before the pending slot: the slot is
/// last-writer-wins across rounds, so an image whose slot was overwritten by
/// a later round still reports `ready` from its turn. A turn with no image
/// and no slot record had its outcome lost (crash, overwritten failure) and
/// reports `failed` so the client can offer a retry.
fn image_status_for(session: &StorySession, round: Round) -> ImageStatus {
    if round < 1 || round > session.round {
        return ImageStatus {
            status: "not_found",
            round,
            image_url: None,
            error: None,
        };
    }

    if let Some(turn) = session.turns.0.iter().find(|t| t.round == round) {
        if let Some(url) = &turn.image_url {
            return ImageStatus {
                status: "ready",
                round,
                image_url: Some(url.clone()),
                error: None,
            };
        }
    }

    if let Some(pending) = &session.pending_image {
        if pending.0.round == round {
            return match pending.0.status {
                PendingImageStatus::Generating => ImageStatus {
                    status: "generating",
                    round,
                    image_url: None,
                    error: None,
                },
                PendingImageStatus::Ready => ImageStatus {
                    status: "ready",
                    round,
                    image_url: pending.0.image_url.clone(),
                    error: None,
                },
                PendingImageStatus::Failed => ImageStatus {
                    status: "failed",
                    round,
                    image_url: None,
                    error: pending.0.error.clone(),
                },
            };
        }
    }

    ImageStatus {
        status: "failed",
        round,
        image_url: None,
        error: Some("image result unavailable".to_string()),
    }
}
