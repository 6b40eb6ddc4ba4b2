//! Repository for the `story_sessions` table.
//!
//! All turn-history writes are single guarded UPDATE statements so a crash
//! at any point leaves either the old document or the new one, never a
//! half-written turn. Round uniqueness doubles as the optimistic-concurrency
//! guard: two simultaneous submissions for one session cannot both append.

use sqlx::types::Json;
use sqlx::PgPool;
use storyweaver_core::characters::CharacterRegistry;
use storyweaver_core::types::{Round, SessionId};
use storyweaver_core::variance::SceneAnalysis;

use crate::legacy::convert_legacy_history;
use crate::models::session::{
    GenerationStatus, NewSession, PendingImage, SessionSummary, StorySession, Turn,
};

/// Column list for `story_sessions` queries.
const COLUMNS: &str = "\
    id, user_id, protagonist_name, protagonist_description, theme, \
    reading_level, style_guide, generation_status, generation_error, \
    round, turns, character_registry, pending_image, \
    legacy_history, legacy_images, created_at, updated_at";

/// Maximum rows returned by the per-user session list.
const LIST_LIMIT: i64 = 50;

/// Provides persistence operations for story sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session together with its completed opening turn.
    pub async fn create(pool: &PgPool, input: &NewSession) -> Result<StorySession, sqlx::Error> {
        let query = format!(
            "INSERT INTO story_sessions \
             (id, user_id, protagonist_name, protagonist_description, theme, \
              reading_level, style_guide, generation_status, round, turns, \
              character_registry) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StorySession>(&query)
            .bind(input.id)
            .bind(&input.user_id)
            .bind(&input.protagonist_name)
            .bind(&input.protagonist_description)
            .bind(&input.theme)
            .bind(&input.reading_level)
            .bind(&input.style_guide)
            .bind(GenerationStatus::Ready.as_str())
            .bind(Json(std::slice::from_ref(&input.first_turn)))
            .bind(Json(&input.character_registry))
            .fetch_one(pool)
            .await
    }

    /// Fetch a session, migrating it out of the legacy flat-history shape
    /// first if necessary. Callers never observe the legacy format.
    pub async fn find_by_id(
        pool: &PgPool,
        session_id: SessionId,
    ) -> Result<Option<StorySession>, sqlx::Error> {
        let Some(session) = Self::fetch(pool, session_id).await? else {
            return Ok(None);
        };

        if session.legacy_history.is_none() {
            return Ok(Some(session));
        }

        Self::migrate_legacy(pool, &session).await?;
        Self::fetch(pool, session_id).await
    }

    async fn fetch(
        pool: &PgPool,
        session_id: SessionId,
    ) -> Result<Option<StorySession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM story_sessions WHERE id = $1");
        sqlx::query_as::<_, StorySession>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Rewrite a legacy session as structured turns and drop the legacy
    /// columns. The `legacy_history IS NOT NULL` guard makes a second
    /// concurrent run a no-op.
    async fn migrate_legacy(pool: &PgPool, session: &StorySession) -> Result<(), sqlx::Error> {
        let history = session
            .legacy_history
            .as_ref()
            .map(|h| h.0.as_slice())
            .unwrap_or_default();
        let images = session
            .legacy_images
            .as_ref()
            .map(|i| i.0.as_slice())
            .unwrap_or_default();

        let turns = convert_legacy_history(history, images, session.created_at);
        let round = turns.len() as Round;

        let result = sqlx::query(
            "UPDATE story_sessions \
             SET turns = $2, round = $3, \
                 legacy_history = NULL, legacy_images = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND legacy_history IS NOT NULL",
        )
        .bind(session.id)
        .bind(Json(&turns))
        .bind(round)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(
                session_id = %session.id,
                turns = turns.len(),
                "Migrated legacy session to structured turns",
            );
        }

        Ok(())
    }

    /// Atomically append a complete turn and the updated character registry.
    ///
    /// The guard `round = new_round - 1 AND jsonb_array_length(turns) =
    /// new_round - 1` rejects duplicate and out-of-order rounds in the same
    /// statement that appends, so two racing submissions cannot both
    /// succeed. Returns `false` when the guard fails.
    pub async fn append_turn(
        pool: &PgPool,
        session_id: SessionId,
        turn: &Turn,
        registry: &CharacterRegistry,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE story_sessions \
             SET turns = turns || $3::jsonb, \
                 character_registry = $4, \
                 round = $2, \
                 generation_status = 'ready', \
                 generation_error = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 \
               AND round = $2 - 1 \
               AND jsonb_array_length(turns) = $2 - 1",
        )
        .bind(session_id)
        .bind(turn.round)
        .bind(Json(turn))
        .bind(Json(registry))
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically set one turn's image URL (and scene analysis) by round
    /// number. Touches nothing else in the document. Returns `false` if the
    /// session or round does not exist.
    pub async fn set_turn_image(
        pool: &PgPool,
        session_id: SessionId,
        round: Round,
        image_url: &str,
        scene_analysis: Option<&SceneAnalysis>,
    ) -> Result<bool, sqlx::Error> {
        // Rounds are 1-based and contiguous (enforced by append_turn), so
        // the array index is simply round - 1.
        let result = sqlx::query(
            "UPDATE story_sessions \
             SET turns = jsonb_set( \
                     jsonb_set(turns, ARRAY[($2 - 1)::text, 'image_url'], to_jsonb($3::text)), \
                     ARRAY[($2 - 1)::text, 'scene_analysis'], COALESCE($4::jsonb, 'null'::jsonb)), \
                 updated_at = NOW() \
             WHERE id = $1 AND jsonb_array_length(turns) >= $2 AND $2 >= 1",
        )
        .bind(session_id)
        .bind(round)
        .bind(image_url)
        .bind(scene_analysis.map(Json))
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the session's single pending-image slot (last-writer-wins).
    pub async fn set_pending_image(
        pool: &PgPool,
        session_id: SessionId,
        pending: &PendingImage,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE story_sessions SET pending_image = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(session_id)
        .bind(Json(pending))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the session as generating its next turn. Returns `false` if the
    /// session does not exist.
    pub async fn mark_generating(
        pool: &PgPool,
        session_id: SessionId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE story_sessions \
             SET generation_status = 'generating', updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(session_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a narrative generation failure on the session.
    pub async fn mark_error(
        pool: &PgPool,
        session_id: SessionId,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE story_sessions \
             SET generation_status = 'error', generation_error = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Drop any incomplete turns left by a crashed writer, restoring the
    /// complete-turns-only invariant. Returns `true` if recovery rewrote
    /// the session.
    pub async fn recover_incomplete_turns(
        pool: &PgPool,
        session_id: SessionId,
    ) -> Result<bool, sqlx::Error> {
        let Some(session) = Self::fetch(pool, session_id).await? else {
            return Ok(false);
        };

        let turns = &session.turns.0;
        let complete: Vec<&Turn> = turns.iter().filter(|t| t.completed_at.is_some()).collect();
        if complete.len() == turns.len() {
            return Ok(false);
        }

        tracing::warn!(
            session_id = %session_id,
            dropped = turns.len() - complete.len(),
            "Recovering session from incomplete turn state",
        );

        let round = complete.len() as Round;
        let status = if complete.is_empty() {
            GenerationStatus::Error
        } else {
            GenerationStatus::Ready
        };

        sqlx::query(
            "UPDATE story_sessions \
             SET turns = $2, round = $3, generation_status = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(Json(&complete))
        .bind(round)
        .bind(status.as_str())
        .execute(pool)
        .await?;

        Ok(true)
    }

    /// Most recently updated sessions for one user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<SessionSummary>, sqlx::Error> {
        sqlx::query_as::<_, SessionSummary>(
            "SELECT id, protagonist_name, theme, round, \
                    turns->0->>'image_url' AS first_image_url, \
                    created_at, updated_at \
             FROM story_sessions \
             WHERE user_id = $1 \
             ORDER BY updated_at DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(LIST_LIMIT)
        .fetch_all(pool)
        .await
    }
}
