//! Prompt templates for every generation role.
//!
//! Templates are plain `format!` renderers; the injected pieces (history,
//! character roster, style guide, wildcard) are produced elsewhere and passed
//! in. The narrator's structured-output schema lives here too so the backend
//! adapter never hardcodes domain shapes.

use crate::variance::SceneVariance;

/// JSON schema for the narrator's structured response: story text, exactly
/// three choices, and the characters visible in the scene.
pub fn narrator_response_schema() -> serde_json::Value {
    serde_json::json!({
        "name": "story_response",
        "schema": {
            "type": "object",
            "properties": {
                "story_text": {
                    "type": "string",
                    "description": "The next story segment"
                },
                "choice_1": {
                    "type": "string",
                    "description": "First choice, first person (\"I ...\")"
                },
                "choice_2": {
                    "type": "string",
                    "description": "Second choice, first person (\"I ...\")"
                },
                "choice_3": {
                    "type": "string",
                    "description": "Third choice, first person (\"I ...\")"
                },
                "characters_in_scene": {
                    "type": "array",
                    "description": "Characters visible in the scene",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": {
                                "type": "string",
                                "description": "Visual description, new characters only"
                            }
                        },
                        "required": ["name"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["story_text", "choice_1", "choice_2", "choice_3", "characters_in_scene"],
            "additionalProperties": false
        }
    })
}

/// Prompt for the once-per-session visual style guide.
pub fn style_guide(protagonist_name: &str, protagonist_description: &str, theme: &str) -> String {
    format!(
        "Create a short visual art style description (1-2 sentences, English) \
         for an illustrated children's story. Protagonist: {protagonist_name}, \
         {protagonist_description}. Theme: {theme}. Describe medium, palette \
         and mood only. Answer with the style description and nothing else."
    )
}

/// Prompt for the opening story segment.
pub fn opening(
    protagonist_name: &str,
    protagonist_description: &str,
    theme: &str,
    reading_level: &str,
) -> String {
    format!(
        "You are a storyteller for children (reading level: {reading_level}). \
         Begin a new interactive story. Protagonist: {protagonist_name} \
         ({protagonist_description}). Theme: {theme}. Write a warm opening \
         segment of 3-5 short sentences, then offer exactly three choices in \
         first person. Introduce every visible character with a visual \
         description. Respond with JSON matching the provided schema."
    )
}

/// Prompt for a continuation turn.
pub fn narrator(
    history: &str,
    choice_made: &str,
    wildcard: &str,
    registry_text: &str,
    reading_level: &str,
) -> String {
    format!(
        "You are a storyteller for children (reading level: {reading_level}). \
         Continue the interactive story below.\n\n\
         Story so far:\n{history}\n\n\
         The player just chose: {choice_made}\n\n\
         Known characters (keep their appearance exactly as described):\n\
         {registry_text}\n\n\
         Somewhere in this segment, weave in: {wildcard}.\n\n\
         Write the next segment of 3-5 short sentences, then offer exactly \
         three new choices in first person. List every character visible in \
         the scene; give a visual description only for characters appearing \
         for the first time. Respond with JSON matching the provided schema."
    )
}

/// Prompt for the binary safety classification.
pub fn validator(story_text: &str) -> String {
    format!(
        "You check stories for a young child. Is the following text \
         appropriate for a 7-year-old — free of graphic violence, horror, \
         romance beyond friendship, and frightening themes?\n\n\
         Text:\n{story_text}\n\n\
         Answer with exactly one word: SAFE or UNSAFE. No other output."
    )
}

/// Prompt for the supplementary fun fact shown while the next turn generates.
pub fn fun_nugget(context: &str) -> String {
    format!(
        "Write one short, cheerful 'did you know?' fact for a child, loosely \
         related to this story moment:\n\n{context}\n\n\
         One sentence only. No quotation marks."
    )
}

/// Prompt for the scene-intensity estimate (1 = calm, 5 = dramatic).
pub fn scene_intensity(story_text: &str) -> String {
    // The analyzer only needs the gist; cap the excerpt.
    let excerpt: String = story_text.chars().take(500).collect();
    format!(
        "Rate the intensity of this story scene on a scale of 1 (calm, \
         peaceful) to 5 (dramatic, exciting).\n\nScene:\n{excerpt}\n\n\
         Respond with JSON: {{\"intensity_level\": <1-5>}}"
    )
}

/// Prompt for the choice-specific image description.
///
/// The illustration must show the character performing the chosen action,
/// not just the resulting scene — the image celebrates the player's choice.
pub fn choice_image(
    choice_made: &str,
    story_text: &str,
    characters: &[(String, String)],
) -> String {
    let roster = if characters.is_empty() {
        "none listed".to_string()
    } else {
        characters
            .iter()
            .map(|(name, description)| format!("{name}: {description}"))
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Write a 2-3 sentence English image description showing the \
         character actively doing this: \"{choice_made}\". Show the action \
         itself, mid-motion, not the aftermath.\n\n\
         Story context:\n{story_text}\n\n\
         Characters in scene: {roster}\n\n\
         Answer with the description only."
    )
}

/// Assemble the final image-generation prompt from its parts.
///
/// Registry descriptions are included verbatim — they are the only thing
/// keeping character appearance stable across independently generated images.
pub fn final_image(
    choice_prompt: &str,
    style_guide: &str,
    characters: &[(String, String)],
    variance: &SceneVariance,
) -> String {
    let character_text = if characters.is_empty() {
        "no specific character descriptions".to_string()
    } else {
        characters
            .iter()
            .map(|(name, description)| format!("{name}: {description}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "{choice_prompt}\n\
         Style: {style_guide}\n\
         Characters: {character_text}\n\
         Perspective: {perspective}\n\
         Lighting: {lighting}\n\
         Framing: {framing}",
        perspective = variance.perspective,
        lighting = variance.lighting,
        framing = variance.framing,
    )
}
