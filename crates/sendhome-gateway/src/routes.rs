//! HTTP surface: JSON endpoints plus Server-Sent Events for session
//! generation progress and NPC dialogue.

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderValue, Method, Request};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{Stream, StreamExt};
use sendhome_core::{
    CaseBrief, Decision, DialogueSegment, GameError, GameResult, GameService, PipelineEvent,
    Resolution, SecondaryCheckResult, SessionStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::api_error::{ApiError, ApiJson};

/// Progress events are small; a short buffer keeps the pipeline from running
/// far ahead of a slow client.
const PROGRESS_BUFFER: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService>,
}

type EventStream = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

pub fn build_app(state: AppState, cors_origins: &[String], public_dir: Option<&Path>) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/sessions", post(start_session))
        .route("/sessions/:session_id/next-case", get(next_case))
        .route("/sessions/:session_id/status", get(status))
        .route(
            "/sessions/:session_id/cases/:case_id/questions",
            post(ask),
        )
        .route(
            "/sessions/:session_id/cases/:case_id/secondary-check",
            post(secondary_check),
        )
        .route(
            "/sessions/:session_id/cases/:case_id/resolve",
            post(resolve),
        );

    let mut app = Router::new()
        .route("/health", get(health))
        .nest("/game/v1", api)
        .with_state(state);

    if let Some(dir) = public_dir {
        // Unknown paths fall through to the SPA entry point with a 200.
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(middleware::from_fn(log_request)).layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Run a synchronous `GameService` call on the blocking pool; those calls read
/// and write the session store inline.
async fn on_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&GameService) -> GameResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| ApiError(GameError::Internal(format!("store task failed: {}", e))))?;
    Ok(result?)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    #[serde(default)]
    num_cases: i64,
}

#[derive(Serialize)]
struct ErrorEvent<'a> {
    code: &'a str,
    message: String,
}

fn error_event(err: &GameError) -> Event {
    let body = ErrorEvent {
        code: err.code(),
        message: err.to_string(),
    };
    Event::default()
        .event("error")
        .json_data(&body)
        .unwrap_or_else(|_| Event::default().event("error").data(err.to_string()))
}

fn pipeline_event(event: &PipelineEvent) -> Event {
    let built = match event {
        PipelineEvent::Progress(p) => Event::default().event("progress").json_data(p),
        PipelineEvent::Ready(r) => Event::default().event("ready").json_data(r),
    };
    built.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode pipeline event");
        Event::default().event("error").data("event encoding failed")
    })
}

/// `POST /game/v1/sessions`: generate a session, streaming `progress` events
/// and finishing with `ready` (or `error`).
async fn start_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StartSessionRequest>,
) -> Result<EventStream, ApiError> {
    // Reject a bad count up front so the client gets a plain 400.
    state.service.case_count(req.num_cases)?;

    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(PROGRESS_BUFFER);
    let service = Arc::clone(&state.service);
    let num_cases = req.num_cases;
    let task = tokio::spawn(async move { service.start_session(num_cases, tx).await });

    let events = stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(pipeline_event(&event));
        }
        match task.await {
            Ok(Ok(ready)) => {
                tracing::info!(session_id = %ready.session_id, cases = ready.total_cases, "session ready");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session generation failed");
                yield Ok(error_event(&e));
            }
            Err(e) => {
                tracing::error!(error = %e, "session generation task panicked");
                yield Ok(error_event(&GameError::Internal(e.to_string())));
            }
        }
    };
    Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::default()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaseBriefBody {
    #[serde(flatten)]
    brief: CaseBrief,
    /// Base64 MP3, absent when no audio was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    opening_audio: Option<String>,
}

async fn next_case(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<CaseBriefBody>, ApiError> {
    let brief = on_store(&state, move |service| service.next_case(&session_id)).await?;
    let opening_audio = brief
        .opening_audio
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(|a| BASE64.encode(a));
    Ok(Json(CaseBriefBody {
        brief,
        opening_audio,
    }))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

fn dialogue_event(segment: DialogueSegment) -> Event {
    match segment {
        DialogueSegment::Text(text) => Event::default().event("text").data(text),
        DialogueSegment::Audio(audio) => Event::default().event("audio").data(BASE64.encode(audio)),
        DialogueSegment::Done => Event::default().event("done").data(""),
    }
}

/// `POST .../questions`: the NPC's reply as `text`, optional `audio`, then `done`.
async fn ask(
    State(state): State<AppState>,
    UrlPath((session_id, case_id)): UrlPath<(String, String)>,
    ApiJson(req): ApiJson<AskRequest>,
) -> Result<EventStream, ApiError> {
    let segments = on_store(&state, move |service| {
        service.ask(&session_id, &case_id, &req.question)
    })
    .await?;
    let events = segments.map(|segment| Ok::<_, Infallible>(dialogue_event(segment)));
    Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecondaryCheckRequest {
    employee_id: String,
}

async fn secondary_check(
    State(state): State<AppState>,
    UrlPath((session_id, case_id)): UrlPath<(String, String)>,
    ApiJson(req): ApiJson<SecondaryCheckRequest>,
) -> Result<Json<SecondaryCheckResult>, ApiError> {
    let result = on_store(&state, move |service| {
        service.secondary_check(&session_id, &case_id, &req.employee_id)
    })
    .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    decision: Decision,
}

async fn resolve(
    State(state): State<AppState>,
    UrlPath((session_id, case_id)): UrlPath<(String, String)>,
    ApiJson(req): ApiJson<ResolveRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let resolution = state
        .service
        .resolve(&session_id, &case_id, req.decision)
        .await?;
    Ok(Json(resolution))
}

async fn status(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    let status = on_store(&state, move |service| service.status(&session_id)).await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use sendhome_core::{GameConfig, MemorySessionStore, SilentSynthesizer};
    use sendhome_narrative::OfflineNarrator;
    use sendhome_voice::NameHashVoicePolicy;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn service() -> Arc<GameService> {
        let config = GameConfig {
            max_num_cases: 10,
            ..GameConfig::default()
        };
        Arc::new(GameService::new(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(OfflineNarrator),
            Arc::new(SilentSynthesizer),
            Arc::new(NameHashVoicePolicy),
        ))
    }

    fn app(service: &Arc<GameService>) -> Router {
        build_app(
            AppState {
                service: Arc::clone(service),
            },
            &["http://localhost:5173".to_string()],
            None,
        )
    }

    async fn session(service: &Arc<GameService>, cases: i64) -> String {
        let (tx, mut rx) = mpsc::channel(64);
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let ready = service
            .start_session_on(cases, "2126-10-16", tx)
            .await
            .unwrap();
        drain.await.unwrap();
        ready.session_id
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// `(event, data)` pairs from a finished SSE body.
    fn sse_events(body: &str) -> Vec<(String, String)> {
        body.split("\n\n")
            .filter_map(|block| {
                let mut name = None;
                let mut data = Vec::new();
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        name = Some(v.trim_start().to_string());
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push(v.strip_prefix(' ').unwrap_or(v).to_string());
                    }
                }
                name.map(|n| (n, data.join("\n")))
            })
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(app(&service()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn start_session_streams_progress_then_ready() {
        let svc = service();
        let (status, body) = send(
            app(&svc),
            "POST",
            "/game/v1/sessions",
            Some(json!({ "numCases": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let events = sse_events(&body);
        let (last, data) = events.last().unwrap();
        assert_eq!(last, "ready");
        let ready: Value = serde_json::from_str(data).unwrap();
        assert_eq!(ready["totalCases"], 3);

        let progress: Vec<Value> = events
            .iter()
            .filter(|(e, _)| e == "progress")
            .map(|(_, d)| serde_json::from_str(d).unwrap())
            .collect();
        assert_eq!(progress.len(), 6);
        assert!(progress.iter().all(|p| p["total"] == 5));
        assert_eq!(progress.last().unwrap()["current"], 5);

        let session_id = ready["sessionId"].as_str().unwrap();
        let (status, _) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/status", session_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn too_many_cases_is_bad_request() {
        let (status, body) = send(
            app(&service()),
            "POST",
            "/game/v1/sessions",
            Some(json!({ "numCases": 99 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (status, body) = send(
            app(&service()),
            "GET",
            "/game/v1/sessions/nope/next-case",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "not_found");
    }

    #[tokio::test]
    async fn next_case_hides_ground_truth() {
        let svc = service();
        let id = session(&svc, 2).await;
        let (status, body) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/next-case", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let brief: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(brief["caseId"], "case-1");
        assert_eq!(brief["caseNumber"], 1);
        assert_eq!(brief["totalCases"], 2);
        assert_eq!(brief["documents"].as_array().unwrap().len(), 2);
        assert!(brief.get("openingAudio").is_none());
        assert!(!body.contains("truth"));
        assert!(!body.contains("correct_decision"));
        assert!(!body.contains("EMP-0001"));
    }

    #[tokio::test]
    async fn resolve_scores_and_advances() {
        let svc = service();
        let id = session(&svc, 2).await;
        let uri = format!("/game/v1/sessions/{}/cases/case-1/resolve", id);

        let (status, _) = send(app(&svc), "POST", &uri, Some(json!({ "decision": "secondary_check" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(app(&svc), "POST", &uri, Some(json!({ "decision": "approve" }))).await;
        assert_eq!(status, StatusCode::OK);
        let res: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(res["correct"], true);
        assert_eq!(res["scoreDelta"], 10);
        assert!(res["verdict"].as_str().unwrap().starts_with("Correct!"));

        let (_, body) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/next-case", id),
            None,
        )
        .await;
        let brief: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(brief["caseId"], "case-2");
        assert_eq!(brief["score"], 10);
    }

    #[tokio::test]
    async fn secondary_checks_run_out() {
        let svc = service();
        let id = session(&svc, 1).await;
        let uri = format!("/game/v1/sessions/{}/cases/case-1/secondary-check", id);

        let (status, body) = send(app(&svc), "POST", &uri, Some(json!({ "employeeId": "EMP-0001" }))).await;
        assert_eq!(status, StatusCode::OK);
        let check: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(check["valid"], true);
        assert_eq!(check["remainingChecks"], 2);

        for _ in 0..2 {
            let (status, _) = send(app(&svc), "POST", &uri, Some(json!({ "employeeId": "EMP-9999" }))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = send(app(&svc), "POST", &uri, Some(json!({ "employeeId": "EMP-0001" }))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "resource_exhausted");
    }

    #[tokio::test]
    async fn question_streams_text_then_done() {
        let svc = service();
        let id = session(&svc, 1).await;
        let uri = format!("/game/v1/sessions/{}/cases/case-1/questions", id);

        let (status, body) = send(app(&svc), "POST", &uri, Some(json!({ "question": "Where are you headed?" }))).await;
        assert_eq!(status, StatusCode::OK);
        let events = sse_events(&body);
        let names: Vec<&str> = events.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(names, vec!["text", "done"]);
        assert!(!events[0].1.is_empty());

        let (status, _) = send(app(&svc), "POST", &uri, Some(json!({ "question": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn finished_session_rejects_next_case() {
        let svc = service();
        let id = session(&svc, 1).await;
        let (status, _) = send(
            app(&svc),
            "POST",
            &format!("/game/v1/sessions/{}/cases/case-1/resolve", id),
            Some(json!({ "decision": "deny" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/next-case", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "failed_precondition");

        let (_, body) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/status", id),
            None,
        )
        .await;
        let status: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(status["sessionComplete"], true);
        assert_eq!(status["incorrectDecisions"], 1);
        assert_eq!(status["score"], -15);
    }

    #[tokio::test]
    async fn malformed_bodies_are_invalid_arguments() {
        let svc = service();
        let id = session(&svc, 1).await;
        let uri = format!("/game/v1/sessions/{}/cases/case-1/resolve", id);

        let (status, body) = send(app(&svc), "POST", &uri, Some(json!({ "decision": "maybe" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "invalid_argument");
        assert!(err["message"].as_str().unwrap().contains("maybe"));

        let (status, body) = send(
            app(&svc),
            "POST",
            &format!("/game/v1/sessions/{}/cases/case-1/secondary-check", id),
            Some(json!({ "claimedId": "EMP-0001" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["code"], "invalid_argument");

        // Nothing was resolved or spent.
        let (_, body) = send(
            app(&svc),
            "GET",
            &format!("/game/v1/sessions/{}/status", id),
            None,
        )
        .await;
        let status: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(status["casesCompleted"], 0);
        assert_eq!(status["remainingSecondaryChecks"], 3);
    }

    #[tokio::test]
    async fn client_routes_fall_back_to_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let svc = service();
        let app = || {
            build_app(
                AppState {
                    service: Arc::clone(&svc),
                },
                &[],
                Some(dir.path()),
            )
        };

        let (status, body) = send(app(), "GET", "/play/shift", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html></html>");

        let (status, body) = send(app(), "GET", "/app.js", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = send(app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
