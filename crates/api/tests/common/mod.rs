//! Shared test harness: a scripted generation backend and HTTP helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use storyweaver_api::config::ServerConfig;
use storyweaver_api::router::build_app_router;
use storyweaver_api::state::AppState;
use storyweaver_core::config::StoryConfig;
use storyweaver_genai::{GenAiError, GenerationBackend, ImageRequest, TextRequest};
use tokio::sync::Notify;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// A narrator response every scripted default run can fall back to.
pub const DEFAULT_NARRATION: &str = r#"{
    "story_text": "The forest hums softly as Mira arrives.",
    "choice_1": "I follow the fireflies",
    "choice_2": "I climb the old oak",
    "choice_3": "I rest by the stream",
    "characters_in_scene": [
        {"name": "Mira", "description": "a curious girl with a red scarf"}
    ]
}"#;

pub const DEFAULT_IMAGE_URL: &str = "https://img.example/generated.png";

type Script = Mutex<VecDeque<Result<String, GenAiError>>>;

/// Generation backend with per-role scripted responses.
///
/// Requests are routed by model identifier (each role in [`StoryConfig`] has
/// a distinct default model name). Roles without a queued response return a
/// benign default, so tests only script what they assert on.
#[derive(Default)]
pub struct ScriptedBackend {
    narrator: Script,
    validator: Script,
    style_guide: Script,
    images: Script,
    image_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_narrator(&self, result: Result<&str, GenAiError>) {
        self.narrator
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_validator(&self, result: Result<&str, GenAiError>) {
        self.validator
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_style_guide(&self, result: Result<&str, GenAiError>) {
        self.style_guide
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_image(&self, result: Result<&str, GenAiError>) {
        self.images
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    /// Hold the next image call until the returned handle is notified, so a
    /// test can observe the in-flight state deterministically.
    pub fn hold_images(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.image_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

fn pop(script: &Script) -> Option<Result<String, GenAiError>> {
    script.lock().unwrap().pop_front()
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenAiError> {
        let defaults = StoryConfig::default();
        let model = request.model.as_str();

        if model == defaults.narrator_model {
            return pop(&self.narrator).unwrap_or_else(|| Ok(DEFAULT_NARRATION.to_string()));
        }
        if model == defaults.validator_model {
            return pop(&self.validator).unwrap_or_else(|| Ok("SAFE".to_string()));
        }
        if model == defaults.fun_nugget_model {
            return Ok("Did you know? Fireflies talk with light!".to_string());
        }
        if model == defaults.style_guide_model {
            return pop(&self.style_guide)
                .unwrap_or_else(|| Ok("Soft watercolor with warm golden light".to_string()));
        }
        if model == defaults.scene_analyzer_model {
            return Ok(r#"{"intensity_level": 2}"#.to_string());
        }
        if model == defaults.image_prompt_model {
            return Ok("Mira leaps across the stream, mid-motion.".to_string());
        }
        Err(GenAiError::Malformed(format!("unscripted model: {model}")))
    }

    async fn generate_image(&self, _request: ImageRequest) -> Result<String, GenAiError> {
        let gate = self.image_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        pop(&self.images).unwrap_or_else(|| Ok(DEFAULT_IMAGE_URL.to_string()))
    }
}

/// Build the full application router with the production middleware stack,
/// backed by the given pool and scripted backend.
pub fn build_test_app(pool: PgPool, backend: Arc<ScriptedBackend>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        story: Arc::new(StoryConfig::default()),
        backend,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("valid JSON body")
}

/// Poll the image endpoint until it reports `want` (or time out).
pub async fn poll_image_status(
    app: &Router,
    session_id: &str,
    round: i32,
    want: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let response = get(
            app,
            &format!("/api/v1/stories/{session_id}/images/{round}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["data"]["status"] == want {
            return json;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("image for round {round} never reached status {want}");
}
