//! Conversion of legacy flat-history sessions to structured turns.
//!
//! Early sessions stored the narrative as one flat JSON array of strings,
//! alternating story text and player choices (choices prefixed with
//! `[Choice]:`), with image URLs in a separate per-round list. The
//! conversion here is pure; `SessionRepo::find_by_id` applies it lazily and
//! writes the result back exactly once.

use serde::{Deserialize, Serialize};
use storyweaver_core::history::CHOICE_MARKER;
use storyweaver_core::narration::CHOICE_COUNT;
use storyweaver_core::types::{Round, Timestamp};

use crate::models::session::Turn;

/// Separately stored image reference from the legacy format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImage {
    pub round: Round,
    pub url: String,
}

/// Placeholder offered for historic turns whose real choices were never
/// recorded.
pub const PLACEHOLDER_CHOICE: &str = "Continue the story...";

/// Convert a legacy flat history into structured turns.
///
/// A `[Choice]:` entry names the action that led to the *following* story
/// segment, so it becomes that segment's `choice_made`; the opening turn has
/// none. Rounds are renumbered 1-based. Image URLs are joined by round
/// number. `at` stamps `started_at`/`completed_at`, keeping the conversion
/// deterministic — running it twice over the same inputs yields identical
/// output.
pub fn convert_legacy_history(
    history: &[String],
    images: &[LegacyImage],
    at: Timestamp,
) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut pending_choice: Option<String> = None;

    for entry in history {
        if let Some(choice) = entry.strip_prefix(CHOICE_MARKER) {
            pending_choice = Some(choice.trim().to_string());
            continue;
        }

        let story_text = entry.trim();
        if story_text.is_empty() {
            continue;
        }

        let round = turns.len() as Round + 1;
        // A choice can only lead somewhere from an existing turn; anything
        // before the first story segment is noise.
        let choice_made = pending_choice.take().filter(|_| round > 1);
        turns.push(Turn {
            round,
            choice_made,
            story_text: story_text.to_string(),
            choices: vec![PLACEHOLDER_CHOICE.to_string(); CHOICE_COUNT],
            fun_nugget: String::new(),
            image_url: images
                .iter()
                .find(|image| image.round == round)
                .map(|image| image.url.clone()),
            scene_analysis: None,
            started_at: at,
            completed_at: Some(at),
        });
    }

    turns
}
