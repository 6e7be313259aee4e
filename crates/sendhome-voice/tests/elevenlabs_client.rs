//! ElevenLabs client against a local stand-in for the TTS endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use sendhome_core::{Emotion, RetryPolicy, VoiceError, VoiceSynthesizer};
use sendhome_voice::ElevenLabsSynthesizer;
use serde_json::Value;

#[derive(Default)]
struct Recorder {
    hits: AtomicUsize,
    fail_first: usize,
    fail_status: u16,
    seen: Mutex<Vec<(String, Option<String>, Value)>>,
}

async fn tts(
    State(rec): State<Arc<Recorder>>,
    Path(voice_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Vec<u8>) {
    let n = rec.hits.fetch_add(1, Ordering::SeqCst);
    let key = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    rec.seen.lock().unwrap().push((voice_id, key, body));
    if n < rec.fail_first {
        (StatusCode::from_u16(rec.fail_status).unwrap(), b"nope".to_vec())
    } else {
        (StatusCode::OK, b"ID3-fake-mp3".to_vec())
    }
}

async fn serve(rec: Recorder) -> (Arc<Recorder>, String) {
    let rec = Arc::new(rec);
    let app = Router::new()
        .route("/v1/text-to-speech/:voice_id", post(tts))
        .with_state(Arc::clone(&rec));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (rec, format!("http://{}/v1", addr))
}

fn fast() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter_factor: 0.0,
    }
}

#[tokio::test]
async fn unconfigured_returns_empty_audio() {
    let synth = ElevenLabsSynthesizer::new(None);
    assert!(!synth.is_configured());
    let audio = synth
        .synthesize("21m00Tcm4TlvDq8ikWAM", "Hello", Some(Emotion::Happy))
        .await
        .unwrap();
    assert!(audio.is_empty());
}

#[tokio::test]
async fn posts_text_with_emotion_settings() {
    let (rec, base) = serve(Recorder::default()).await;
    let synth = ElevenLabsSynthesizer::new(Some("xi-test".into()))
        .with_base_url(&base)
        .with_retry(fast());

    let audio = synth
        .synthesize("pNInz6obpgDQGcFmaJgB", "Stamp it already.", Some(Emotion::Angry))
        .await
        .unwrap();
    assert_eq!(audio, b"ID3-fake-mp3");

    let seen = rec.seen.lock().unwrap();
    let (voice, key, body) = &seen[0];
    assert_eq!(voice, "pNInz6obpgDQGcFmaJgB");
    assert_eq!(key.as_deref(), Some("xi-test"));
    assert_eq!(body["text"], "Stamp it already.");
    assert_eq!(body["model_id"], "eleven_turbo_v2_5");
    assert_eq!(body["voice_settings"]["style"], 0.75);
    assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
}

#[tokio::test]
async fn overload_is_retried() {
    let (rec, base) = serve(Recorder {
        fail_first: 1,
        fail_status: 503,
        ..Default::default()
    })
    .await;
    let synth = ElevenLabsSynthesizer::new(Some("xi-test".into()))
        .with_base_url(&base)
        .with_retry(fast());
    let audio = synth.synthesize("v", "hi", None).await.unwrap();
    assert!(!audio.is_empty());
    assert_eq!(rec.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn bad_key_fails_once() {
    let (rec, base) = serve(Recorder {
        fail_first: usize::MAX,
        fail_status: 401,
        ..Default::default()
    })
    .await;
    let synth = ElevenLabsSynthesizer::new(Some("wrong".into()))
        .with_base_url(&base)
        .with_retry(fast());
    let err = synth.synthesize("v", "hi", None).await.unwrap_err();
    assert!(matches!(err, VoiceError::Api { status: 401, .. }));
    assert_eq!(rec.hits.load(Ordering::SeqCst), 1);
}
