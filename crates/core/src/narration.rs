//! Parsing of generation-backend output.
//!
//! The narrator is asked for JSON but the backend is not trusted to comply:
//! responses arrive with markdown code fences, missing fields, or as free
//! text. Everything funnels into [`ParsedNarration`] — `Malformed` routes to
//! the same fallback path as a safety violation instead of propagating as an
//! error.

use serde::{Deserialize, Serialize};

/// Fixed number of forward choices per turn.
pub const CHOICE_COUNT: usize = 3;

/// Scene intensity bounds (1 = calm, 5 = dramatic).
pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 5;

/// Used whenever intensity analysis fails or returns something out of range.
pub const DEFAULT_INTENSITY: u8 = 3;

/// A character the narrator placed in the current scene. `description` is
/// only expected for characters appearing for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneCharacter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fully parsed narrator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub story_text: String,
    /// Exactly [`CHOICE_COUNT`] entries.
    pub choices: Vec<String>,
    pub characters_in_scene: Vec<SceneCharacter>,
}

/// Outcome of interpreting a narrator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNarration {
    Valid(Narration),
    /// The raw text is kept for logging; it is never persisted or shown.
    Malformed { raw: String },
}

/// Wire shape of the narrator's JSON response.
#[derive(Debug, Deserialize)]
struct NarratorResponse {
    story_text: String,
    choice_1: String,
    choice_2: String,
    choice_3: String,
    #[serde(default)]
    characters_in_scene: Vec<SceneCharacter>,
}

/// Parse a narrator response, tolerating markdown code fences.
pub fn parse_narration(raw: &str) -> ParsedNarration {
    let cleaned = strip_code_fences(raw);

    let Ok(response) = serde_json::from_str::<NarratorResponse>(cleaned) else {
        return ParsedNarration::Malformed {
            raw: raw.to_string(),
        };
    };

    let story_text = response.story_text.trim().to_string();
    let choices: Vec<String> = [response.choice_1, response.choice_2, response.choice_3]
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    if story_text.is_empty() || choices.iter().any(|c| c.is_empty()) {
        return ParsedNarration::Malformed {
            raw: raw.to_string(),
        };
    }

    ParsedNarration::Valid(Narration {
        story_text,
        choices,
        characters_in_scene: response.characters_in_scene,
    })
}

/// Verdict of the safety classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe,
    Unsafe,
}

/// Interpret the safety classifier's answer.
///
/// The classifier is instructed to answer only `SAFE` or `UNSAFE`. Anything
/// other than an exact (case-insensitive, trimmed) `SAFE` is treated as
/// `Unsafe` — fail closed. Substring matching would be wrong here: `UNSAFE`
/// contains `SAFE`.
pub fn parse_safety_verdict(raw: &str) -> SafetyVerdict {
    if raw.trim().eq_ignore_ascii_case("SAFE") {
        SafetyVerdict::Safe
    } else {
        SafetyVerdict::Unsafe
    }
}

/// Wire shape of the scene-intensity analyzer's response.
#[derive(Debug, Deserialize)]
struct IntensityResponse {
    intensity_level: i64,
}

/// Parse a scene-intensity response, clamping to the valid range and falling
/// back to [`DEFAULT_INTENSITY`] on any parse failure.
pub fn parse_intensity(raw: &str) -> u8 {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<IntensityResponse>(cleaned) {
        Ok(response) if (MIN_INTENSITY as i64..=MAX_INTENSITY as i64)
            .contains(&response.intensity_level) =>
        {
            response.intensity_level as u8
        }
        _ => DEFAULT_INTENSITY,
    }
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
