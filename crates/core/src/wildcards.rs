//! Wildcard narrative seeds.
//!
//! The narrator is sampled with high temperature and no memory beyond the
//! passed-in history, which makes repeated calls converge on the same plot
//! beats. One randomly drawn seed per turn is injected into the narrator
//! prompt to push each session somewhere different.

use rand::seq::IndexedRandom;
use rand::Rng;

/// Curated pool of narrative seeds. Must stay at 25+ entries; shrinking it
/// reintroduces the cross-session staleness this mechanism exists to prevent.
pub const WILDCARDS: &[&str] = &[
    "a hidden door appears where there was none before",
    "an animal speaks for the first time",
    "something small turns out to be enormous",
    "a gentle rain of glowing petals begins",
    "a map is found with one corner missing",
    "someone is humming a melody from long ago",
    "a bridge appears made of unlikely material",
    "an object in the hero's pocket grows warm",
    "footprints lead in a surprising direction",
    "a friendly stranger asks for help with a riddle",
    "the wind carries a whispered invitation",
    "a staircase spirals up into the clouds",
    "a reflection in the water shows something different",
    "a tiny lantern floats by on its own",
    "the ground hums softly underfoot",
    "a lost letter is waiting to be delivered",
    "two paths swap places when no one is looking",
    "a musical instrument plays itself",
    "a shadow waves hello",
    "a snack shared with a creature earns a favor",
    "an old key fits something unexpected",
    "a cloud drifts low enough to touch",
    "a garden grows in fast-forward",
    "a badge or emblem glints in the grass",
    "someone left a trail of colorful thread",
    "a distant bell rings exactly three times",
    "the stars rearrange themselves briefly",
    "a book's pictures start to move",
];

/// Draw one wildcard seed for the current turn.
pub fn pick_wildcard<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    // Non-empty constant pool; `choose` cannot return None.
    WILDCARDS.choose(rng).copied().unwrap_or(WILDCARDS[0])
}
