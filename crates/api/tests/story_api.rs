//! Integration tests for the story lifecycle over HTTP.
//!
//! Exercises the full stack — router, handlers, orchestrator, image
//! pipeline, session store — against a real database, with the generation
//! backend replaced by a scripted fake.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, poll_image_status, post_json, ScriptedBackend};
use serde_json::json;
use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use storyweaver_core::config::{FALLBACK_CHOICES, FALLBACK_OPENING, FALLBACK_TURN};
use storyweaver_genai::GenAiError;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_body() -> serde_json::Value {
    json!({
        "user_id": "user-1",
        "protagonist_name": "Mira",
        "protagonist_description": "a curious girl with a red scarf",
        "theme": "enchanted forest"
    })
}

async fn start_session(app: &axum::Router) -> (String, serde_json::Value) {
    let response = post_json(app, "/api/v1/stories", start_body()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let session_id = json["data"]["session_id"].as_str().unwrap().to_string();
    (session_id, json)
}

// ---------------------------------------------------------------------------
// Starting a story
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn start_returns_complete_opening_with_image(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend);

    let (session_id, json) = start_session(&app).await;

    let turn = &json["data"]["turn"];
    assert_eq!(turn["round"], 1);
    assert_eq!(turn["choice_made"], serde_json::Value::Null);
    assert_eq!(turn["choices"].as_array().unwrap().len(), 3);
    assert!(!turn["fun_nugget"].as_str().unwrap().is_empty());
    // The round-1 image is generated synchronously.
    assert_eq!(turn["image_url"], common::DEFAULT_IMAGE_URL);

    // The session document carries the seeded character registry.
    let response = get(&app, &format!("/api/v1/stories/{session_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    let registry = session["data"]["character_registry"].as_array().unwrap();
    assert_eq!(registry[0]["name"], "Mira");
    assert_eq!(session["data"]["generation_status"], "ready");
}

#[sqlx::test(migrations = "../../migrations")]
async fn start_survives_round_one_image_failure(pool: PgPool) {
    let backend = ScriptedBackend::new();
    backend.push_image(Err(GenAiError::Api {
        status: 500,
        message: "image backend down".into(),
    }));
    let app = build_test_app(pool, backend);

    let (session_id, json) = start_session(&app).await;

    // The story arrives intact; only the image slot records the failure.
    let turn = &json["data"]["turn"];
    assert_eq!(turn["image_url"], serde_json::Value::Null);
    assert!(!turn["story_text"].as_str().unwrap().is_empty());

    let status = poll_image_status(&app, &session_id, 1, "failed").await;
    assert!(status["data"]["error"].as_str().unwrap().contains("500"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unsafe_opening_is_replaced_by_fallback(pool: PgPool) {
    let backend = ScriptedBackend::new();
    backend.push_validator(Ok("UNSAFE"));
    let app = build_test_app(pool, backend);

    let (_, json) = start_session(&app).await;

    let turn = &json["data"]["turn"];
    assert_eq!(turn["story_text"], FALLBACK_OPENING);
    assert_eq!(turn["choices"][0], FALLBACK_CHOICES[0]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unreachable_safety_gate_falls_back(pool: PgPool) {
    let backend = ScriptedBackend::new();
    backend.push_validator(Err(GenAiError::Transport("connection refused".into())));
    let app = build_test_app(pool, backend);

    let (_, json) = start_session(&app).await;

    // No verdict means no generated text is shown: the gate fails closed.
    let turn = &json["data"]["turn"];
    assert_eq!(turn["story_text"], FALLBACK_OPENING);
    assert_eq!(turn["choices"][0], FALLBACK_CHOICES[0]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn style_guide_failure_aborts_start(pool: PgPool) {
    let backend = ScriptedBackend::new();
    backend.push_style_guide(Err(GenAiError::Transport("connect timeout".into())));
    let app = build_test_app(pool, backend);

    // The style guide is generated exactly once per session, so a failure
    // must abort rather than permanently degrade the visuals.
    let response = post_json(&app, "/api/v1/stories", start_body()).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "GENERATION_FAILED");
}

#[sqlx::test(migrations = "../../migrations")]
async fn start_rejects_blank_protagonist(pool: PgPool) {
    let app = build_test_app(pool, ScriptedBackend::new());

    let mut body = start_body();
    body["protagonist_name"] = json!("   ");
    let response = post_json(&app, "/api/v1/stories", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Submitting choices
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn submit_choice_appends_turn_and_images_async(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend);
    let (session_id, _) = start_session(&app).await;

    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I follow the fireflies"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let turn = &json["data"];
    assert_eq!(turn["round"], 2);
    assert_eq!(turn["choice_made"], "I follow the fireflies");
    // The turn ships immediately; its image arrives by polling.
    assert_eq!(turn["image_url"], serde_json::Value::Null);

    let status = poll_image_status(&app, &session_id, 2, "ready").await;
    assert_eq!(status["data"]["image_url"], common::DEFAULT_IMAGE_URL);

    // The image landed on the turn record too.
    let session = body_json(get(&app, &format!("/api/v1/stories/{session_id}")).await).await;
    assert_eq!(
        session["data"]["turns"][1]["image_url"],
        common::DEFAULT_IMAGE_URL
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_status_is_generating_immediately_after_submit(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend.clone());
    let (session_id, _) = start_session(&app).await;

    // Hold the image backend so the background job stays in flight.
    let gate = backend.hold_images();
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I follow the fireflies"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The pending slot is written before the turn response goes out, so the
    // very first poll already reports the job rather than a stale failure.
    let response = get(&app, &format!("/api/v1/stories/{session_id}/images/2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "generating");

    gate.notify_one();
    let status = poll_image_status(&app, &session_id, 2, "ready").await;
    assert_eq!(status["data"]["image_url"], common::DEFAULT_IMAGE_URL);
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_failure_never_blocks_the_story(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend.clone());
    let (session_id, _) = start_session(&app).await;

    backend.push_image(Err(GenAiError::Transport("connection reset".into())));
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I climb the old oak"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = poll_image_status(&app, &session_id, 2, "failed").await;
    assert!(status["data"]["error"].is_string());

    // The narrative is untouched and the next turn proceeds normally.
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I rest by the stream"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["round"], 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn malformed_narration_falls_back(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend.clone());
    let (session_id, _) = start_session(&app).await;

    backend.push_narrator(Ok("Once upon a time, with no JSON in sight."));
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I open the gate"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["story_text"], FALLBACK_TURN);
    assert_eq!(json["data"]["round"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn narrator_transport_failure_is_retryable(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend.clone());
    let (session_id, _) = start_session(&app).await;

    backend.push_narrator(Err(GenAiError::Transport("timeout".into())));
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I follow the fireflies"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "GENERATION_FAILED");

    // No partial turn was persisted; the same choice succeeds on retry.
    let session = body_json(get(&app, &format!("/api/v1/stories/{session_id}")).await).await;
    assert_eq!(session["data"]["round"], 1);
    assert_eq!(session["data"]["generation_status"], "error");

    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "I follow the fireflies"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["round"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn blank_choice_is_rejected_before_generation(pool: PgPool) {
    let backend = ScriptedBackend::new();
    let app = build_test_app(pool, backend);
    let (session_id, _) = start_session(&app).await;

    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/turns"),
        json!({"choice_text": "  "}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let session = body_json(get(&app, &format!("/api/v1/stories/{session_id}")).await).await;
    assert_eq!(session["data"]["round"], 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_session_is_404(pool: PgPool) {
    let app = build_test_app(pool, ScriptedBackend::new());

    let response = post_json(
        &app,
        &format!("/api/v1/stories/{}/turns", Uuid::new_v4()),
        json!({"choice_text": "I wander off"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Image retry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn failed_image_can_be_retried(pool: PgPool) {
    let backend = ScriptedBackend::new();
    backend.push_image(Err(GenAiError::Api {
        status: 503,
        message: "overloaded".into(),
    }));
    let app = build_test_app(pool, backend.clone());

    let (session_id, _) = start_session(&app).await;
    poll_image_status(&app, &session_id, 1, "failed").await;

    let gate = backend.hold_images();
    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/images/1/retry"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // The slot flips to `generating` before the 202 is returned.
    let status = body_json(get(&app, &format!("/api/v1/stories/{session_id}/images/1")).await).await;
    assert_eq!(status["data"]["status"], "generating");

    // The retry uses the default scripted image and succeeds.
    gate.notify_one();
    let status = poll_image_status(&app, &session_id, 1, "ready").await;
    assert_eq!(status["data"]["image_url"], common::DEFAULT_IMAGE_URL);
}

#[sqlx::test(migrations = "../../migrations")]
async fn retry_for_unknown_round_is_rejected(pool: PgPool) {
    let app = build_test_app(pool, ScriptedBackend::new());
    let (session_id, _) = start_session(&app).await;

    let response = post_json(
        &app,
        &format!("/api/v1/stories/{session_id}/images/7/retry"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_status_for_unknown_round_is_not_found(pool: PgPool) {
    let app = build_test_app(pool, ScriptedBackend::new());
    let (session_id, _) = start_session(&app).await;

    let response = get(&app, &format!("/api/v1/stories/{session_id}/images/9")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "not_found");
}

// ---------------------------------------------------------------------------
// Session listing and legacy migration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn user_story_list_returns_summaries(pool: PgPool) {
    let app = build_test_app(pool, ScriptedBackend::new());
    let (session_id, _) = start_session(&app).await;

    let response = get(&app, "/api/v1/users/user-1/stories").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let list = json["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], session_id.as_str());
    assert_eq!(list[0]["protagonist_name"], "Mira");
    assert_eq!(list[0]["first_image_url"], common::DEFAULT_IMAGE_URL);

    let empty = body_json(get(&app, "/api/v1/users/somebody-else/stories").await).await;
    assert!(empty["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn reading_a_legacy_session_migrates_it(pool: PgPool) {
    let id = Uuid::new_v4();
    let history = vec![
        "Tom the mouse wakes in the castle kitchen.".to_string(),
        "[Choice]: Sneak past the cat".to_string(),
        "He tiptoes past the sleeping cat.".to_string(),
    ];
    sqlx::query(
        "INSERT INTO story_sessions \
         (id, user_id, protagonist_name, protagonist_description, theme, \
          style_guide, round, turns, legacy_history) \
         VALUES ($1, 'user-legacy', 'Tom', 'a brave mouse', 'castle', '', 0, '[]', $2)",
    )
    .bind(id)
    .bind(SqlxJson(history))
    .execute(&pool)
    .await
    .unwrap();

    let app = build_test_app(pool, ScriptedBackend::new());
    let json = body_json(get(&app, &format!("/api/v1/stories/{id}")).await).await;

    assert_eq!(json["data"]["round"], 2);
    let turns = json["data"]["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["choice_made"], serde_json::Value::Null);
    assert_eq!(turns[1]["choice_made"], "Sneak past the cat");
    // The legacy columns never leak into the API document.
    assert!(json["data"].get("legacy_history").is_none());
}
