//! Persistent character registry.
//!
//! Every image call is prompt-only — no image-to-image conditioning — so the
//! only thing keeping a character's appearance stable across rounds is the
//! textual description captured the first time the narrator introduces them.
//! Descriptions are therefore write-once: merges only ever advance
//! `last_seen_round`.

use serde::{Deserialize, Serialize};

use crate::narration::SceneCharacter;
use crate::types::Round;

/// One registry entry. `description` holds visual traits only and is never
/// overwritten once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub description: String,
    pub first_seen_round: Round,
    pub last_seen_round: Round,
}

/// Ordered roster of characters for one session, persisted as a JSONB array.
///
/// Order is insertion order (first appearance), which keeps prompt output
/// stable across rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterRegistry {
    characters: Vec<Character>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Merge characters mentioned in a narrator response into the roster.
    ///
    /// - Known names: only `last_seen_round` advances; the stored description
    ///   wins even if the narrator re-described the character differently.
    /// - New names with a description: appended.
    /// - New names without a description: skipped — an entry without visual
    ///   traits would poison later image prompts.
    pub fn merge(&mut self, seen: &[SceneCharacter], round: Round) {
        for mention in seen {
            let name = mention.name.trim();
            if name.is_empty() {
                continue;
            }

            if let Some(existing) = self.characters.iter_mut().find(|c| c.name == name) {
                existing.last_seen_round = round;
                continue;
            }

            let Some(description) = mention
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
            else {
                continue;
            };

            self.characters.push(Character {
                name: name.to_string(),
                description: description.to_string(),
                first_seen_round: round,
                last_seen_round: round,
            });
        }
    }

    /// Descriptions for the named characters, in the order given.
    ///
    /// Names missing from the roster are dropped rather than mapped to an
    /// empty string, so image prompts never carry nameless placeholders.
    pub fn descriptions_for(&self, names: &[String]) -> Vec<(String, String)> {
        names
            .iter()
            .filter_map(|name| {
                self.get(name)
                    .map(|c| (c.name.clone(), c.description.clone()))
            })
            .collect()
    }

    /// Format the full roster for injection into the narrator prompt.
    ///
    /// Empty roster renders as an empty string so templates can splice it in
    /// unconditionally.
    pub fn format_for_prompt(&self) -> String {
        self.characters
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
