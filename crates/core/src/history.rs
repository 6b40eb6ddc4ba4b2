//! Narrative history context for the narrator prompt.
//!
//! Long sessions cannot ship every past turn to the narrator. Instead of
//! summarizing old turns with an extra generation call, the window keeps the
//! most recent turns verbatim and compresses everything older into a plain
//! list of the choices taken, which preserves the causal chain at a fixed
//! cost per turn.

/// Marker prefixed to a player's choice in history text. Also the marker used
/// by the legacy flat-history session format.
pub const CHOICE_MARKER: &str = "[Choice]:";

/// Number of most-recent turns included verbatim in the narrator context.
pub const RECENT_TURN_WINDOW: usize = 12;

/// Borrowed view of one turn, decoupled from the persistence layer's types.
#[derive(Debug, Clone, Copy)]
pub struct HistoryTurn<'a> {
    pub choice_made: Option<&'a str>,
    pub story_text: &'a str,
}

/// Render the narrator context from the session's turns.
///
/// Turns beyond [`RECENT_TURN_WINDOW`] are elided down to their choices; the
/// recent window is rendered in full, each turn as an optional
/// `[Choice]: ...` line followed by its story text.
pub fn history_text(turns: &[HistoryTurn<'_>]) -> String {
    let split = turns.len().saturating_sub(RECENT_TURN_WINDOW);
    let (elided, recent) = turns.split_at(split);

    let mut sections = Vec::new();

    if !elided.is_empty() {
        let earlier: Vec<&str> = elided.iter().filter_map(|t| t.choice_made).collect();
        if !earlier.is_empty() {
            sections.push(format!("Earlier choices: {}", earlier.join("; ")));
        }
    }

    for turn in recent {
        let mut lines = Vec::new();
        if let Some(choice) = turn.choice_made {
            lines.push(format!("{CHOICE_MARKER} {choice}"));
        }
        if !turn.story_text.is_empty() {
            lines.push(turn.story_text.to_string());
        }
        if !lines.is_empty() {
            sections.push(lines.join("\n"));
        }
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn<'a>(choice: Option<&'a str>, story: &'a str) -> HistoryTurn<'a> {
        HistoryTurn {
            choice_made: choice,
            story_text: story,
        }
    }

    #[test]
    fn opening_turn_has_no_choice_line() {
        let text = history_text(&[turn(None, "The story begins.")]);
        assert_eq!(text, "The story begins.");
    }

    #[test]
    fn choices_are_marked() {
        let text = history_text(&[
            turn(None, "The story begins."),
            turn(Some("I open the door"), "Behind it, a garden."),
        ]);
        assert_eq!(
            text,
            "The story begins.\n\n[Choice]: I open the door\nBehind it, a garden."
        );
    }

    #[test]
    fn old_turns_collapse_to_choice_list() {
        let turns: Vec<String> = (0..20).map(|i| format!("Segment {i}.")).collect();
        let choices: Vec<String> = (0..20).map(|i| format!("choice {i}")).collect();
        let history: Vec<HistoryTurn> = turns
            .iter()
            .zip(&choices)
            .enumerate()
            .map(|(i, (story, choice))| HistoryTurn {
                choice_made: (i > 0).then_some(choice.as_str()),
                story_text: story.as_str(),
            })
            .collect();

        let text = history_text(&history);

        // The 8 oldest turns are elided; their choices survive as a list,
        // ending at the window boundary.
        assert!(text.starts_with("Earlier choices: "));
        assert!(text.contains("choice 6; choice 7"));
        assert!(!text.contains("Segment 3."));
        // The recent window is verbatim, starting right after the boundary.
        assert!(text.contains("[Choice]: choice 8"));
        assert!(text.contains("Segment 19."));
        assert!(text.contains("[Choice]: choice 19"));
    }

    #[test]
    fn short_histories_are_untouched() {
        let text = history_text(&[
            turn(None, "One."),
            turn(Some("go"), "Two."),
            turn(Some("run"), "Three."),
        ]);
        assert!(!text.contains("Earlier choices"));
        assert!(text.contains("One."));
        assert!(text.contains("Three."));
    }
}
