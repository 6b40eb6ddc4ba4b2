//! Scene variance selector.
//!
//! Successive illustrations are generated from text alone, so without forced
//! variation they drift toward the same centered, midday composition. Each
//! image draws a random perspective and framing, and a lighting treatment
//! bounded by the scene's intensity so a calm scene never gets storm lighting.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::narration::{DEFAULT_INTENSITY, MAX_INTENSITY, MIN_INTENSITY};

/// Camera perspectives, drawn uniformly regardless of intensity.
pub const PERSPECTIVES: &[&str] = &[
    "eye-level view",
    "low-angle view looking up",
    "high bird's-eye view",
    "over-the-shoulder view",
    "wide establishing shot",
    "close-up on the action",
];

/// Framing options, drawn uniformly regardless of intensity.
pub const FRAMINGS: &[&str] = &[
    "subject centered in frame",
    "subject off-center following the rule of thirds",
    "subject framed by foreground foliage",
    "subject small against a vast background",
];

/// Lighting pool for calm scenes (intensity 1-2).
pub const LIGHTING_CALM: &[&str] = &[
    "soft golden-hour light",
    "gentle morning sunshine",
    "warm candlelit glow",
    "pale moonlight with soft shadows",
];

/// Lighting pool for mid-intensity scenes (intensity 3).
pub const LIGHTING_MEDIUM: &[&str] = &[
    "bright midday light with crisp shadows",
    "dappled light through leaves",
    "colorful sunset sky",
    "cool twilight blues",
];

/// Lighting pool for dramatic scenes (intensity 4-5).
pub const LIGHTING_DRAMATIC: &[&str] = &[
    "dramatic storm light with dark clouds",
    "flickering firelight and deep shadows",
    "lightning-lit sky",
    "intense beams breaking through darkness",
];

/// One randomized-but-bounded draw of visual parameters for a single image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneVariance {
    pub perspective: String,
    pub lighting: String,
    pub framing: String,
}

/// Intensity/variance metadata retained on the turn for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneAnalysis {
    pub intensity: u8,
    pub perspective: String,
    pub lighting: String,
    pub framing: String,
}

impl SceneAnalysis {
    pub fn new(intensity: u8, variance: &SceneVariance) -> Self {
        Self {
            intensity,
            perspective: variance.perspective.clone(),
            lighting: variance.lighting.clone(),
            framing: variance.framing.clone(),
        }
    }
}

/// Lighting pool appropriate for the given intensity.
pub fn lighting_pool(intensity: u8) -> &'static [&'static str] {
    match intensity {
        0..=2 => LIGHTING_CALM,
        3 => LIGHTING_MEDIUM,
        _ => LIGHTING_DRAMATIC,
    }
}

/// Draw a variance combination for a scene of the given intensity.
///
/// Out-of-range intensities are clamped to [`DEFAULT_INTENSITY`]'s bounds
/// rather than rejected — the estimate is advisory, not authoritative.
pub fn select_variance<R: Rng + ?Sized>(intensity: u8, rng: &mut R) -> SceneVariance {
    let intensity = if (MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        intensity
    } else {
        DEFAULT_INTENSITY
    };

    // The pools are non-empty constants, so `choose` cannot return None.
    let perspective = PERSPECTIVES.choose(rng).copied().unwrap_or(PERSPECTIVES[0]);
    let lighting = lighting_pool(intensity)
        .choose(rng)
        .copied()
        .unwrap_or(LIGHTING_MEDIUM[0]);
    let framing = FRAMINGS.choose(rng).copied().unwrap_or(FRAMINGS[0]);

    SceneVariance {
        perspective: perspective.to_string(),
        lighting: lighting.to_string(),
        framing: framing.to_string(),
    }
}
