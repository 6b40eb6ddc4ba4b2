//! Generation backend adapter.
//!
//! Provides a uniform call surface over an OpenRouter-style chat-completions
//! API capable of producing text or images from a prompt plus sampling
//! parameters. The [`backend::GenerationBackend`] trait is the seam the
//! orchestrator and tests program against; [`client::GenAiClient`] is the
//! production implementation.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::{GenerationBackend, ImageRequest, TextRequest};
pub use client::{GenAiClient, GenAiConfig};
pub use error::GenAiError;
