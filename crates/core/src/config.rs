//! Immutable generation configuration.
//!
//! Loaded once at process start and passed by `Arc` into every component.
//! Models and sampling parameters are per-role: the narrator, the safety
//! validator, the fun-nugget writer, the style-guide writer, the scene
//! analyzer, the image-prompt writer, and the image generator each get their
//! own knobs.

use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded verbatim to the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Pre-authored fallback story segment for a rejected or malformed opening.
pub const FALLBACK_OPENING: &str =
    "Oh, let's begin a different story! A soft light appears ahead of you, \
     inviting you onward. What happens next?";

/// Pre-authored fallback story segment for a rejected or malformed turn.
pub const FALLBACK_TURN: &str =
    "Oh, that was an interesting twist! But let's take the story in another \
     direction. A new path opens up before you.";

/// Fallback choices shown alongside a fallback story segment.
pub const FALLBACK_CHOICES: [&str; 3] = [
    "I look around carefully",
    "I keep walking along the path",
    "I call out to see who answers",
];

/// Fallback shown when the fun-nugget call fails.
pub const FALLBACK_FUN_NUGGET: &str =
    "Did you know? Every story you play through is one of a kind!";

/// Per-role model identifiers and sampling parameters.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    pub narrator_model: String,
    pub validator_model: String,
    pub fun_nugget_model: String,
    pub style_guide_model: String,
    pub scene_analyzer_model: String,
    pub image_prompt_model: String,
    pub image_model: String,

    pub narrator_sampling: SamplingParams,
    pub validator_sampling: SamplingParams,
    pub fun_nugget_sampling: SamplingParams,
    pub style_guide_sampling: SamplingParams,
    pub scene_analyzer_sampling: SamplingParams,
    pub image_prompt_sampling: SamplingParams,

    /// Aspect ratio requested for every illustration.
    pub image_aspect_ratio: String,
    /// Target reading level recorded on each session.
    pub reading_level: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            narrator_model: "storyteller-large".to_string(),
            validator_model: "safety-validator".to_string(),
            fun_nugget_model: "fun-nugget-mini".to_string(),
            style_guide_model: "style-guide-mini".to_string(),
            scene_analyzer_model: "scene-analyzer-mini".to_string(),
            image_prompt_model: "image-prompt-mini".to_string(),
            image_model: "illustrator-xl".to_string(),

            // High temperature plus a presence penalty is part of the
            // anti-repetition contract, together with the wildcard pool.
            // Lowering these reintroduces cross-session plot staleness.
            narrator_sampling: SamplingParams {
                temperature: Some(0.95),
                top_p: Some(0.95),
                presence_penalty: Some(0.6),
                frequency_penalty: Some(0.3),
                max_tokens: Some(1200),
            },
            validator_sampling: SamplingParams {
                temperature: Some(0.0),
                max_tokens: Some(8),
                ..SamplingParams::default()
            },
            fun_nugget_sampling: SamplingParams {
                temperature: Some(0.8),
                max_tokens: Some(120),
                ..SamplingParams::default()
            },
            style_guide_sampling: SamplingParams {
                temperature: Some(0.7),
                max_tokens: Some(160),
                ..SamplingParams::default()
            },
            scene_analyzer_sampling: SamplingParams {
                temperature: Some(0.0),
                max_tokens: Some(40),
                ..SamplingParams::default()
            },
            image_prompt_sampling: SamplingParams {
                temperature: Some(0.7),
                max_tokens: Some(240),
                ..SamplingParams::default()
            },

            image_aspect_ratio: "4:3".to_string(),
            reading_level: "second_grade".to_string(),
        }
    }
}

impl StoryConfig {
    /// Load configuration, allowing model identifiers to be overridden via
    /// environment variables. Sampling parameters are fixed at compile time;
    /// they are part of the engine's behavioral contract, not deploy-time
    /// tuning.
    ///
    /// | Env Var                | Default               |
    /// |------------------------|-----------------------|
    /// | `NARRATOR_MODEL`       | `storyteller-large`   |
    /// | `VALIDATOR_MODEL`      | `safety-validator`    |
    /// | `FUN_NUGGET_MODEL`     | `fun-nugget-mini`     |
    /// | `STYLE_GUIDE_MODEL`    | `style-guide-mini`    |
    /// | `SCENE_ANALYZER_MODEL` | `scene-analyzer-mini` |
    /// | `IMAGE_PROMPT_MODEL`   | `image-prompt-mini`   |
    /// | `IMAGE_MODEL`          | `illustrator-xl`      |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let overrides: [(&str, &mut String); 7] = [
            ("NARRATOR_MODEL", &mut config.narrator_model),
            ("VALIDATOR_MODEL", &mut config.validator_model),
            ("FUN_NUGGET_MODEL", &mut config.fun_nugget_model),
            ("STYLE_GUIDE_MODEL", &mut config.style_guide_model),
            ("SCENE_ANALYZER_MODEL", &mut config.scene_analyzer_model),
            ("IMAGE_PROMPT_MODEL", &mut config.image_prompt_model),
            ("IMAGE_MODEL", &mut config.image_model),
        ];

        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    *slot = value;
                }
            }
        }

        config
    }
}
