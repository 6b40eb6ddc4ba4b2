//! The trait seam between the orchestrator and the generation backend.

use async_trait::async_trait;
use storyweaver_core::config::SamplingParams;

use crate::error::GenAiError;

/// A text-generation request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    pub model: String,
    pub sampling: SamplingParams,
    /// When set, the backend is asked for structured output matching this
    /// schema.
    pub json_schema: Option<serde_json::Value>,
}

impl TextRequest {
    pub fn new(prompt: String, model: &str, sampling: &SamplingParams) -> Self {
        Self {
            prompt,
            model: model.to_string(),
            sampling: sampling.clone(),
            json_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.json_schema = Some(schema);
        self
    }
}

/// An image-generation request. No image conditioning: continuity comes from
/// the textual style guide and character descriptions inside `prompt`.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
}

/// Uniform call surface to text- and image-generating models.
///
/// Production uses [`crate::client::GenAiClient`]; tests substitute scripted
/// implementations.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text. Returns the raw assistant content.
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenAiError>;

    /// Generate an image. Returns an image reference (data URL or hosted URL).
    async fn generate_image(&self, request: ImageRequest) -> Result<String, GenAiError>;
}
