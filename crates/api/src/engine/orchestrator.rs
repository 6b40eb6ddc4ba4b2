//! Turn orchestration.
//!
//! Drives the generation calls for a turn in order: narration (plus the fun
//! nugget, concurrently), safety gate, registry merge, atomic append, then a
//! detached image task. Narrative text is the product; images are best-effort.
//!
//! Safety handling is substitution, not refusal: an unsafe or malformed
//! narrator response is replaced by a pre-authored safe segment and the story
//! continues. Only backend transport failures surface as errors.

use chrono::Utc;
use storyweaver_core::config::{
    FALLBACK_CHOICES, FALLBACK_FUN_NUGGET, FALLBACK_OPENING, FALLBACK_TURN,
};
use storyweaver_core::error::CoreError;
use storyweaver_core::history::{history_text, HistoryTurn};
use storyweaver_core::narration::{
    parse_narration, parse_safety_verdict, Narration, ParsedNarration, SafetyVerdict,
    SceneCharacter,
};
use storyweaver_core::prompts;
use storyweaver_core::types::SessionId;
use storyweaver_core::wildcards::pick_wildcard;
use storyweaver_db::models::session::{GenerationStatus, NewSession, StorySession, Turn};
use storyweaver_db::repositories::SessionRepo;
use storyweaver_genai::{GenAiError, TextRequest};
use uuid::Uuid;

use crate::engine::image_pipeline;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Age after which a `generating` status is considered abandoned by a crashed
/// writer and no longer blocks new submissions.
const STALE_GENERATION_SECS: i64 = 120;

/// Inputs for starting a new story.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub user_id: String,
    pub protagonist_name: String,
    pub protagonist_description: String,
    pub theme: String,
}

/// Start a new session: style guide, opening narration, fun nugget, safety
/// gate, registry seed, persisted opening turn, then the round-1 image.
///
/// Everything here is synchronous from the caller's point of view, including
/// the image — the first response should arrive complete. An image failure is
/// still non-fatal: the session is returned with `image_url: null` and a
/// failed pending slot.
pub async fn start_story(state: &AppState, input: NewStory) -> AppResult<StorySession> {
    let config = &state.story;
    let started_at = Utc::now();

    // Style guide first; both the opening image and every later image reuse
    // it. It is generated exactly once, so a failure here aborts the start
    // rather than pinning the session to a degraded style forever.
    let style_guide = match state
        .backend
        .generate_text(TextRequest::new(
            prompts::style_guide(
                &input.protagonist_name,
                &input.protagonist_description,
                &input.theme,
            ),
            &config.style_guide_model,
            &config.style_guide_sampling,
        ))
        .await
    {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, transient = err.is_transient(), "Style guide generation failed");
            return Err(CoreError::Generation(err.to_string()).into());
        }
    };

    let opening_request = TextRequest::new(
        prompts::opening(
            &input.protagonist_name,
            &input.protagonist_description,
            &input.theme,
            &config.reading_level,
        ),
        &config.narrator_model,
        &config.narrator_sampling,
    )
    .with_schema(prompts::narrator_response_schema());

    let nugget_request = TextRequest::new(
        prompts::fun_nugget(&format!(
            "{}'s story about {} is about to begin",
            input.protagonist_name, input.theme
        )),
        &config.fun_nugget_model,
        &config.fun_nugget_sampling,
    );

    let (opening_result, nugget_result) = tokio::join!(
        state.backend.generate_text(opening_request),
        state.backend.generate_text(nugget_request),
    );

    let fun_nugget = nugget_result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Fun nugget generation failed, using fallback");
        FALLBACK_FUN_NUGGET.to_string()
    });

    // The opening is the product; without it there is no session to create.
    // A content-policy rejection is handled like an unsafe narration.
    let narration = match opening_result {
        Ok(raw) => resolve_narration(state, &raw, true).await,
        Err(GenAiError::ContentPolicy(message)) => {
            tracing::warn!(error = %message, "Opening rejected by content policy, substituting fallback");
            fallback_narration(true)
        }
        Err(err) => {
            tracing::error!(error = %err, transient = err.is_transient(), "Opening generation failed");
            return Err(CoreError::Generation(err.to_string()).into());
        }
    };

    let mut registry = storyweaver_core::characters::CharacterRegistry::new();
    registry.merge(&narration.characters_in_scene, 1);

    let first_turn = Turn {
        round: 1,
        choice_made: None,
        story_text: narration.story_text,
        choices: narration.choices,
        fun_nugget,
        image_url: None,
        scene_analysis: None,
        started_at,
        completed_at: Some(Utc::now()),
    };

    let session = SessionRepo::create(
        &state.pool,
        &NewSession {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            protagonist_name: input.protagonist_name,
            protagonist_description: input.protagonist_description,
            theme: input.theme,
            reading_level: config.reading_level.clone(),
            style_guide,
            first_turn,
            character_registry: registry,
        },
    )
    .await?;

    tracing::info!(session_id = %session.id, "Session created");

    // Round-1 image runs inline. A failure is recorded on the pending slot
    // and the session ships without it.
    if let Err(err) = image_pipeline::run(state, session.id, 1).await {
        tracing::warn!(session_id = %session.id, error = %err, "Opening image generation failed");
    }

    SessionRepo::find_by_id(&state.pool, session.id)
        .await?
        .ok_or_else(|| AppError::InternalError("created session disappeared".to_string()))
}

/// Advance a session by one turn for the submitted choice.
///
/// Returns the completed turn with `image_url: null`; the illustration is
/// generated by a detached task and retrieved via polling.
pub async fn submit_choice(
    state: &AppState,
    session_id: SessionId,
    choice_text: &str,
) -> AppResult<Turn> {
    let config = &state.story;
    let started_at = Utc::now();

    let mut session = SessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(CoreError::SessionNotFound { id: session_id })?;

    // A crashed writer may have left a half-appended turn behind.
    if SessionRepo::recover_incomplete_turns(&state.pool, session_id).await? {
        session = SessionRepo::find_by_id(&state.pool, session_id)
            .await?
            .ok_or(CoreError::SessionNotFound { id: session_id })?;
    }

    if session.generation_status == GenerationStatus::Generating.as_str() {
        let age = Utc::now().signed_duration_since(session.updated_at);
        if age < chrono::Duration::seconds(STALE_GENERATION_SECS) {
            return Err(CoreError::Conflict(
                "a turn is already being generated for this session".to_string(),
            )
            .into());
        }
        tracing::warn!(session_id = %session_id, "Stale generating status, proceeding");
    }

    SessionRepo::mark_generating(&state.pool, session_id).await?;

    let turns = &session.turns.0;
    let history_turns: Vec<HistoryTurn<'_>> = turns
        .iter()
        .map(|t| HistoryTurn {
            choice_made: t.choice_made.as_deref(),
            story_text: &t.story_text,
        })
        .collect();
    let history = history_text(&history_turns);
    let wildcard = pick_wildcard(&mut rand::rng());
    let registry_text = session.character_registry.0.format_for_prompt();

    let narrator_request = TextRequest::new(
        prompts::narrator(
            &history,
            choice_text,
            wildcard,
            &registry_text,
            &session.reading_level,
        ),
        &config.narrator_model,
        &config.narrator_sampling,
    )
    .with_schema(prompts::narrator_response_schema());

    let nugget_request = TextRequest::new(
        prompts::fun_nugget(choice_text),
        &config.fun_nugget_model,
        &config.fun_nugget_sampling,
    );

    let (narration_result, nugget_result) = tokio::join!(
        state.backend.generate_text(narrator_request),
        state.backend.generate_text(nugget_request),
    );

    let fun_nugget = nugget_result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Fun nugget generation failed, using fallback");
        FALLBACK_FUN_NUGGET.to_string()
    });

    let narration = match narration_result {
        Ok(raw) => resolve_narration(state, &raw, false).await,
        Err(GenAiError::ContentPolicy(message)) => {
            tracing::warn!(error = %message, "Narration rejected by content policy, substituting fallback");
            fallback_narration(false)
        }
        Err(err) => {
            // No partial turn is persisted; the same choice can be retried.
            tracing::error!(error = %err, transient = err.is_transient(), "Narration generation failed");
            SessionRepo::mark_error(&state.pool, session_id, &err.to_string()).await?;
            return Err(CoreError::Generation(err.to_string()).into());
        }
    };

    let round = session.round + 1;
    let mut registry = session.character_registry.0.clone();
    registry.merge(&narration.characters_in_scene, round);

    let turn = Turn {
        round,
        choice_made: Some(choice_text.to_string()),
        story_text: narration.story_text,
        choices: narration.choices,
        fun_nugget,
        image_url: None,
        scene_analysis: None,
        started_at,
        completed_at: Some(Utc::now()),
    };

    let appended = SessionRepo::append_turn(&state.pool, session_id, &turn, &registry).await?;
    if !appended {
        return Err(CoreError::Conflict(format!(
            "round {round} was already submitted for this session"
        ))
        .into());
    }

    tracing::info!(session_id = %session_id, round, "Turn appended");

    // Slot write plus detached task. A failure here is cosmetic: the turn is
    // already appended and the image can be retried.
    if let Err(err) = image_pipeline::dispatch(state, session_id, round).await {
        tracing::warn!(session_id = %session_id, round, error = %err, "Failed to start image generation");
    }

    Ok(turn)
}

/// Run the narrator output through parsing and the safety gate, substituting
/// the pre-authored fallback segment on any failure.
///
/// The gate fails closed: an inconclusive verdict or an unreachable
/// classifier counts as unsafe.
async fn resolve_narration(state: &AppState, raw: &str, opening: bool) -> Narration {
    let fallback = || fallback_narration(opening);

    let narration = match parse_narration(raw) {
        ParsedNarration::Valid(narration) => narration,
        ParsedNarration::Malformed { raw } => {
            tracing::warn!(
                raw_len = raw.len(),
                "Narrator response malformed, substituting fallback segment",
            );
            return fallback();
        }
    };

    let verdict = state
        .backend
        .generate_text(TextRequest::new(
            prompts::validator(&narration.story_text),
            &state.story.validator_model,
            &state.story.validator_sampling,
        ))
        .await;

    match verdict {
        Ok(answer) if parse_safety_verdict(&answer) == SafetyVerdict::Safe => narration,
        Ok(_) => {
            tracing::warn!("Narration rejected by safety gate, substituting fallback segment");
            fallback()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Safety gate unreachable, substituting fallback segment");
            fallback()
        }
    }
}

/// The pre-authored safe segment used whenever narration cannot be shown.
fn fallback_narration(opening: bool) -> Narration {
    Narration {
        story_text: if opening { FALLBACK_OPENING } else { FALLBACK_TURN }.to_string(),
        choices: FALLBACK_CHOICES.iter().map(|c| c.to_string()).collect(),
        characters_in_scene: Vec::<SceneCharacter>::new(),
    }
}
