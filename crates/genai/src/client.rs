//! HTTP client for the chat-completions generation API.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{GenerationBackend, ImageRequest, TextRequest};
use crate::error::GenAiError;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ImageConfig, ResponseFormat};

/// Text calls finish quickly; images routinely take over a minute.
const TEXT_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for [`GenAiClient`], loaded from the environment.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Chat-completions endpoint, e.g. `https://api.example/v1/chat/completions`.
    pub api_url: String,
    pub api_key: String,
}

impl GenAiConfig {
    /// Read `GENAI_API_URL` and `GENAI_API_KEY`.
    ///
    /// Panics if the key is missing, which is the desired behaviour — a
    /// server without backend credentials cannot do anything useful.
    pub fn from_env() -> Self {
        let api_url = std::env::var("GENAI_API_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".to_string());
        let api_key = std::env::var("GENAI_API_KEY").expect("GENAI_API_KEY must be set");
        Self { api_url, api_key }
    }
}

/// Production generation backend speaking the chat-completions protocol.
pub struct GenAiClient {
    http: reqwest::Client,
    config: GenAiConfig,
}

impl GenAiClient {
    pub fn new(config: GenAiConfig) -> Self {
        // Per-request timeouts are set on each call; the client default is a
        // ceiling for anything that slips through.
        let http = reqwest::Client::builder()
            .timeout(IMAGE_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { http, config }
    }

    async fn post_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatResponse, GenAiError> {
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| GenAiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::Malformed(format!("Invalid response body: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(classify_embedded_error(error.code.as_deref(), error.message));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl GenerationBackend for GenAiClient {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenAiError> {
        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "Text generation call");

        let body = ChatRequest {
            model: request.model,
            messages: vec![ChatMessage::user(request.prompt)],
            sampling: request.sampling,
            response_format: request.json_schema.map(ResponseFormat::json_schema),
            modalities: None,
            image_config: None,
        };

        let response = self.post_chat(&body, TEXT_TIMEOUT).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GenAiError::Malformed("No text content in response".to_string()))?;

        Ok(content)
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<String, GenAiError> {
        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "Image generation call");

        let body = ChatRequest {
            model: request.model,
            messages: vec![ChatMessage::user(request.prompt)],
            sampling: Default::default(),
            response_format: None,
            modalities: Some(vec!["image", "text"]),
            image_config: Some(ImageConfig {
                aspect_ratio: request.aspect_ratio,
            }),
        };

        let response = self.post_chat(&body, IMAGE_TIMEOUT).await?;

        let url = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.images)
            .and_then(|images| images.into_iter().next())
            .map(|image| image.image_url.url)
            .ok_or_else(|| GenAiError::Malformed("No image in response".to_string()))?;

        Ok(url)
    }
}

/// Map a non-2xx HTTP status to a typed error.
fn classify_http_failure(status: u16, body: &str) -> GenAiError {
    let message = if body.is_empty() {
        "no response body".to_string()
    } else {
        body.chars().take(500).collect()
    };

    if status == 403 && message.contains("moderation") {
        return GenAiError::ContentPolicy(message);
    }

    GenAiError::Api { status, message }
}

/// Map an error object embedded in a 200 body to a typed error.
fn classify_embedded_error(code: Option<&str>, message: String) -> GenAiError {
    match code {
        Some("moderation") | Some("content_policy") => GenAiError::ContentPolicy(message),
        _ => GenAiError::Api {
            status: 200,
            message,
        },
    }
}
