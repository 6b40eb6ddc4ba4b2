//! Session entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use storyweaver_core::characters::CharacterRegistry;
use storyweaver_core::types::{Round, SessionId, Timestamp};
use storyweaver_core::variance::SceneAnalysis;

use crate::legacy::LegacyImage;

/// Narrative generation status for the session's latest turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Ready,
    Generating,
    Error,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Ready => "ready",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Error => "error",
        }
    }
}

/// One complete round of narrative.
///
/// Instances are only ever persisted complete: `story_text`, `choices` and
/// `completed_at` all present. `completed_at` is `Option` solely because
/// legacy or crash-era rows may violate that, and recovery needs to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based, strictly monotonic within a session.
    pub round: Round,
    /// The action that led to this turn; `None` for the opening turn.
    pub choice_made: Option<String>,
    pub story_text: String,
    pub choices: Vec<String>,
    pub fun_nugget: String,
    /// `None` until the background image task completes for this round.
    pub image_url: Option<String>,
    /// Intensity/variance metadata retained for reproducibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_analysis: Option<SceneAnalysis>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Status of the session's single pending-image slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingImageStatus {
    Generating,
    Ready,
    Failed,
}

/// Tracking record for the in-flight or most recent background image job.
///
/// At most one per session; last-writer-wins. The per-round result is
/// independently recorded on the matching [`Turn`], so an overwritten slot
/// loses no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingImage {
    pub status: PendingImageStatus,
    pub round: Round,
    pub image_url: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl PendingImage {
    pub fn generating(round: Round, started_at: Timestamp) -> Self {
        Self {
            status: PendingImageStatus::Generating,
            round,
            image_url: None,
            started_at,
            completed_at: None,
            error: None,
        }
    }

    pub fn ready(round: Round, started_at: Timestamp, image_url: String, completed_at: Timestamp) -> Self {
        Self {
            status: PendingImageStatus::Ready,
            round,
            image_url: Some(image_url),
            started_at,
            completed_at: Some(completed_at),
            error: None,
        }
    }

    pub fn failed(round: Round, started_at: Timestamp, error: String, completed_at: Timestamp) -> Self {
        Self {
            status: PendingImageStatus::Failed,
            round,
            image_url: None,
            started_at,
            completed_at: Some(completed_at),
            error: Some(error),
        }
    }
}

/// A session row from the `story_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StorySession {
    pub id: SessionId,
    pub user_id: String,
    pub protagonist_name: String,
    pub protagonist_description: String,
    pub theme: String,
    pub reading_level: String,
    pub style_guide: String,
    pub generation_status: String,
    pub generation_error: Option<String>,
    /// Count of complete turns; equals the latest turn's round number.
    pub round: Round,
    pub turns: Json<Vec<Turn>>,
    pub character_registry: Json<CharacterRegistry>,
    pub pending_image: Option<Json<PendingImage>>,
    #[serde(skip_serializing)]
    pub legacy_history: Option<Json<Vec<String>>>,
    #[serde(skip_serializing)]
    pub legacy_images: Option<Json<Vec<LegacyImage>>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new session, complete with its opening turn.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: SessionId,
    pub user_id: String,
    pub protagonist_name: String,
    pub protagonist_description: String,
    pub theme: String,
    pub reading_level: String,
    pub style_guide: String,
    pub first_turn: Turn,
    pub character_registry: CharacterRegistry,
}

/// Summary row for the per-user story list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub protagonist_name: String,
    pub theme: String,
    pub round: Round,
    pub first_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
