//! The per-turn image pipeline.
//!
//! Intensity estimate, bounded variance draw, choice-focused prompt
//! expansion, image generation, then two targeted writes: the image URL onto
//! its turn, and the outcome onto the session's pending slot. Failures stop
//! at the slot — they never touch the narrative.

use chrono::Utc;
use storyweaver_core::error::CoreError;
use storyweaver_core::narration::{parse_intensity, DEFAULT_INTENSITY};
use storyweaver_core::prompts;
use storyweaver_core::types::{Round, SessionId};
use storyweaver_core::variance::{select_variance, SceneAnalysis};
use storyweaver_db::models::session::{PendingImage, StorySession, Turn};
use storyweaver_db::repositories::SessionRepo;
use storyweaver_genai::{GenAiError, ImageRequest, TextRequest};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Record a `generating` pending slot for `round`, then run the pipeline as
/// a detached task.
///
/// The slot write happens before this returns, so a status poll issued
/// immediately after the triggering request already sees `generating`
/// rather than a missing outcome.
pub async fn dispatch(state: &AppState, session_id: SessionId, round: Round) -> AppResult<()> {
    SessionRepo::set_pending_image(
        &state.pool,
        session_id,
        &PendingImage::generating(round, Utc::now()),
    )
    .await?;
    spawn(state.clone(), session_id, round);
    Ok(())
}

/// Run the pipeline for one round as a detached task.
///
/// The spawned task owns a clone of the state; nothing waits on it. Its
/// outcome is observable only through the pending slot and the turn record.
pub fn spawn(state: AppState, session_id: SessionId, round: Round) {
    tokio::spawn(async move {
        if let Err(err) = run(&state, session_id, round).await {
            tracing::warn!(
                %session_id,
                round,
                error = %err,
                "Background image generation failed",
            );
        }
    });
}

/// Generate the illustration for `round` and record the outcome.
///
/// Writes `generating` to the pending slot up front so pollers see progress,
/// then either the image URL onto the turn plus a `ready` slot, or a `failed`
/// slot carrying the error.
pub async fn run(state: &AppState, session_id: SessionId, round: Round) -> AppResult<()> {
    let session = SessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(CoreError::SessionNotFound { id: session_id })?;

    let turn = session
        .turns
        .0
        .iter()
        .find(|t| t.round == round)
        .cloned()
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "round {round} has no turn to illustrate"
            )))
        })?;

    let started_at = Utc::now();
    SessionRepo::set_pending_image(
        &state.pool,
        session_id,
        &PendingImage::generating(round, started_at),
    )
    .await?;

    match generate(state, &session, &turn).await {
        Ok((image_url, analysis)) => {
            SessionRepo::set_turn_image(&state.pool, session_id, round, &image_url, Some(&analysis))
                .await?;
            SessionRepo::set_pending_image(
                &state.pool,
                session_id,
                &PendingImage::ready(round, started_at, image_url, Utc::now()),
            )
            .await?;
            tracing::info!(%session_id, round, intensity = analysis.intensity, "Image ready");
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            SessionRepo::set_pending_image(
                &state.pool,
                session_id,
                &PendingImage::failed(round, started_at, message.clone(), Utc::now()),
            )
            .await?;
            Err(CoreError::ImageGeneration { round, message }.into())
        }
    }
}

/// The generation calls themselves: intensity, variance, prompt expansion,
/// image. Only the final image call is fatal; every upstream step degrades
/// to a sensible default.
async fn generate(
    state: &AppState,
    session: &StorySession,
    turn: &Turn,
) -> Result<(String, SceneAnalysis), GenAiError> {
    let config = &state.story;

    let intensity = match state
        .backend
        .generate_text(TextRequest::new(
            prompts::scene_intensity(&turn.story_text),
            &config.scene_analyzer_model,
            &config.scene_analyzer_sampling,
        ))
        .await
    {
        Ok(raw) => parse_intensity(&raw),
        Err(err) => {
            tracing::warn!(error = %err, "Intensity analysis failed, using default");
            DEFAULT_INTENSITY
        }
    };

    let variance = select_variance(intensity, &mut rand::rng());

    // The full roster, not just this scene's characters: descriptions are
    // the only continuity between independently generated images.
    let characters: Vec<(String, String)> = session
        .character_registry
        .0
        .characters()
        .iter()
        .map(|c| (c.name.clone(), c.description.clone()))
        .collect();

    // The opening turn has no choice; illustrate the protagonist entering
    // the story instead.
    let action = turn.choice_made.clone().unwrap_or_else(|| {
        format!("{} steps into the story", session.protagonist_name)
    });

    let choice_prompt = match state
        .backend
        .generate_text(TextRequest::new(
            prompts::choice_image(&action, &turn.story_text, &characters),
            &config.image_prompt_model,
            &config.image_prompt_sampling,
        ))
        .await
    {
        Ok(prompt) => prompt,
        Err(err) => {
            tracing::warn!(error = %err, "Choice prompt expansion failed, using raw action");
            let excerpt: String = turn.story_text.chars().take(300).collect();
            format!("{action}. {excerpt}")
        }
    };

    let final_prompt = prompts::final_image(
        &choice_prompt,
        &session.style_guide,
        &characters,
        &variance,
    );

    let image_url = state
        .backend
        .generate_image(ImageRequest {
            prompt: final_prompt,
            model: config.image_model.clone(),
            aspect_ratio: config.image_aspect_ratio.clone(),
        })
        .await?;

    Ok((image_url, SceneAnalysis::new(intensity, &variance)))
}
