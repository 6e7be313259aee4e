//! OpenRouter client against a local stand-in for the chat completions endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use sendhome_core::narrative::DialogueContext;
use sendhome_core::{NarrativeError, NarrativeGenerator, NpcProfile, RetryPolicy};
use sendhome_narrative::OpenRouterNarrator;
use serde_json::{json, Value};

/// Replies in order; the last reply repeats.
struct Script {
    replies: Vec<(u16, String)>,
    hits: AtomicUsize,
    last_body: Mutex<Option<Value>>,
    last_auth: Mutex<Option<String>>,
}

async fn chat(
    State(script): State<Arc<Script>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let n = script.hits.fetch_add(1, Ordering::SeqCst);
    *script.last_body.lock().unwrap() = Some(body);
    *script.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let (status, content) = script.replies[n.min(script.replies.len() - 1)].clone();
    let status = StatusCode::from_u16(status).unwrap();
    if status.is_success() {
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
        .into_response()
    } else {
        (status, content).into_response()
    }
}

async fn serve(replies: Vec<(u16, &str)>) -> (Arc<Script>, OpenRouterNarrator) {
    let script = Arc::new(Script {
        replies: replies.into_iter().map(|(s, c)| (s, c.to_string())).collect(),
        hits: AtomicUsize::new(0),
        last_body: Mutex::new(None),
        last_auth: Mutex::new(None),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .with_state(Arc::clone(&script));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let narrator = OpenRouterNarrator::new("sk-test")
        .with_api_url(&format!("http://{}/v1/chat/completions", addr))
        .with_model("test/model")
        .with_retry(RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        });
    (script, narrator)
}

#[tokio::test]
async fn rules_from_fenced_reply() {
    let (script, narrator) = serve(vec![(
        200,
        "```json\n[\"Only COMPLETE shifts can board\", \"No ore samples\", \"Expired badges get denied\"]\n```",
    )])
    .await;

    let rules = narrator.generate_rules("2126-10-16").await.unwrap();
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[1], "No ore samples");

    let body = script.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "test/model");
    assert_eq!(body["temperature"], 1.0);
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("2126-10-16"));
    assert_eq!(
        script.last_auth.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (script, narrator) = serve(vec![
        (503, "overloaded"),
        (429, "slow down"),
        (200, "[\"Personal items only\"]"),
    ])
    .await;
    let rules = narrator.generate_rules("2126-10-16").await.unwrap();
    assert_eq!(rules, vec!["Personal items only"]);
    assert_eq!(script.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_run_out() {
    let (script, narrator) = serve(vec![(500, "boom")]).await;
    let err = narrator.generate_rules("2126-10-16").await.unwrap_err();
    assert!(matches!(err, NarrativeError::Api { status: 500, .. }));
    assert_eq!(script.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let (script, narrator) = serve(vec![(401, "bad key")]).await;
    let err = narrator.generate_rules("2126-10-16").await.unwrap_err();
    assert!(matches!(err, NarrativeError::Api { status: 401, .. }));
    assert_eq!(script.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unparsable_cases_are_malformed() {
    let (_, narrator) = serve(vec![(200, "I cannot help with that.")]).await;
    let err = narrator
        .generate_cases(&["No ore samples".to_string()], 3, "2126-10-16")
        .await
        .unwrap_err();
    assert!(matches!(err, NarrativeError::Malformed(_)));
}

#[tokio::test]
async fn dialogue_uses_higher_temperature() {
    let (script, narrator) = serve(vec![(200, "  Just tired, clerk.  ")]).await;
    let context = DialogueContext {
        question: "Why are you sweating?".into(),
        npc: NpcProfile {
            name: "Oona Sato".into(),
            personality: "nervous".into(),
            ..Default::default()
        },
        truth: Default::default(),
    };
    let line = narrator.generate_dialogue(&context).await.unwrap();
    assert_eq!(line, "Just tired, clerk.");
    let body = script.last_body.lock().unwrap().clone().unwrap();
    assert!((body["temperature"].as_f64().unwrap() - 1.2).abs() < 1e-6);
}
