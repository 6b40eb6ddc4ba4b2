//! Domain logic for the story weaver engine.
//!
//! Everything in this crate is pure: no I/O, no database handles, no HTTP.
//! The orchestration layer in `storyweaver-api` wires these pieces to the
//! generation backend and the session store.

pub mod characters;
pub mod config;
pub mod error;
pub mod history;
pub mod narration;
pub mod prompts;
pub mod types;
pub mod validate;
pub mod variance;
pub mod wildcards;
