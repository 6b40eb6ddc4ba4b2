//! Wire types for the chat-completions API.

use serde::{Deserialize, Serialize};
use storyweaver_core::config::SamplingParams;

/// One message in the chat payload. Prompts are sent as a single user turn.
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

/// Structured-output request: `{"type": "json_schema", "json_schema": ...}`.
#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub json_schema: serde_json::Value,
}

impl ResponseFormat {
    pub fn json_schema(schema: serde_json::Value) -> Self {
        Self {
            kind: "json_schema",
            json_schema: schema,
        }
    }
}

/// Aspect-ratio hint for image requests.
#[derive(Debug, Serialize)]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

/// Outgoing request body. Sampling parameters are flattened into the top
/// level per the API's convention.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub sampling: SamplingParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

/// Error object embedded in an otherwise-200 response body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Image entry in a multimodal response.
#[derive(Debug, Deserialize)]
pub struct ImageOutput {
    pub image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Assistant message in a response choice.
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageOutput>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

/// Incoming response body. The API reports some failures inside a 200 body
/// via `error`, so both fields must be inspected.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}
