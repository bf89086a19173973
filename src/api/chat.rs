use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task;
use tracing::{error, warn};

use crate::api::AppState;
use crate::services::assistant::error::AssistantError;
use crate::services::assistant::formatter::render_markup;
use crate::services::assistant::run_chat_turn;
use crate::services::assistant::traits::JobService;
use crate::services::assistant::NO_MESSAGE_PROVIDED;
use crate::utils::json_stream::json_stream_channel;

const GENERIC_ERROR_RESPONSE: &str = "An error occurred while processing your request";
const INVALID_RENDER_BODY: &str = "Invalid render request body";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    text: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/chat/render", post(render))
        .route("/api/chat/status", get(status))
}

/// Body shared by every failed turn, synchronous or streamed.
pub fn error_body(err: &AssistantError) -> Value {
    let response = match err {
        AssistantError::InvalidInput(msg) => msg.as_str(),
        _ => GENERIC_ERROR_RESPONSE,
    };
    json!({
        "response": response,
        "error": err.to_string(),
        "code": err.code(),
    })
}

fn error_response(err: &AssistantError) -> (StatusCode, Json<Value>) {
    (err.status_code(), Json(error_body(err)))
}

/// Checks run before any job is submitted: credential first, then input.
fn precheck(
    state: &AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(Arc<dyn JobService>, String), (StatusCode, Json<Value>)> {
    let service = state.service().map_err(|err| {
        error!("[CHAT] rejected: {}", err);
        error_response(&err)
    })?;
    let message = match payload {
        Ok(Json(req)) => req.message.unwrap_or_default(),
        Err(rejection) => {
            warn!("[CHAT] unreadable body: {}", rejection.body_text());
            String::new()
        }
    };
    if message.trim().is_empty() {
        return Err(error_response(&AssistantError::InvalidInput(
            NO_MESSAGE_PROVIDED.to_string(),
        )));
    }
    Ok((service, message))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let (service, message) = match precheck(&state, payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match run_chat_turn(service.as_ref(), &state.persona, &state.policy, Some(&message)).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "response": reply }))),
        Err(err) => error_response(&err),
    }
}

/// Same turn as `chat`, but the 200 is sent right away and the body carries
/// exactly one JSON object once the turn settles.
async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let (service, message) = match precheck(&state, payload) {
        Ok(v) => v,
        Err(resp) => return resp.into_response(),
    };

    let (body, sender) = json_stream_channel();
    task::spawn(async move {
        let result =
            run_chat_turn(service.as_ref(), &state.persona, &state.policy, Some(&message)).await;
        let value = match result {
            Ok(reply) => json!({ "response": reply }),
            Err(err) => error_body(&err),
        };
        sender.send_json(&value);
    });

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn render(
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    match payload {
        Ok(Json(req)) => {
            let html = render_markup(req.text.as_deref().unwrap_or(""));
            (StatusCode::OK, Json(json!({ "html": html })))
        }
        Err(rejection) => {
            warn!("[RENDER] unreadable body: {}", rejection.body_text());
            error_response(&AssistantError::InvalidInput(
                INVALID_RENDER_BODY.to_string(),
            ))
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let millis = |d: std::time::Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    Json(json!({
        "status": "ok",
        "timestamp": crate::core::time::now_rfc3339(),
        "openai": {
            "configured": state.service.is_some(),
            "base_url": state.base_url,
        },
        "assistant_id": state.persona.assistant_id,
        "polling": {
            "max_attempts": state.policy.max_attempts,
            "initial_delay_ms": millis(state.policy.initial_delay),
            "max_delay_ms": millis(state.policy.max_delay),
        }
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    use super::*;
    use crate::services::assistant::testing::FakeJobService;
    use crate::services::assistant::types::{AssistantPersona, JobStatus, PollPolicy};

    fn state_with(service: Option<FakeJobService>) -> AppState {
        AppState {
            service: service.map(|s| Arc::new(s) as Arc<dyn JobService>),
            persona: AssistantPersona {
                assistant_id: "asst_test".to_string(),
                instructions: "IFRS helper".to_string(),
            },
            policy: PollPolicy::default(),
            base_url: "http://fake".to_string(),
        }
    }

    fn request(message: Option<&str>) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(ChatRequest {
            message: message.map(|m| m.to_string()),
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn chat_returns_cleaned_reply() {
        let fake = FakeJobService::with_reply(
            vec![JobStatus::Running, JobStatus::Running, JobStatus::Completed],
            "IFRS S2 covers climate disclosures.【1】",
        );
        let (status, Json(body)) = chat(
            State(state_with(Some(fake.clone()))),
            request(Some("What is IFRS S2?")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "IFRS S2 covers climate disclosures.");
        assert_eq!(fake.status_calls(), 3);
    }

    #[tokio::test]
    async fn chat_rejects_empty_message_without_calls() {
        let fake = FakeJobService::with_statuses(vec![JobStatus::Completed]);
        let (status, Json(body)) =
            chat(State(state_with(Some(fake.clone()))), request(Some(""))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["response"], "No message provided");
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(fake.total_calls(), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_a_server_error() {
        let (status, Json(body)) = chat(State(state_with(None)), request(Some("hello"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["response"], GENERIC_ERROR_RESPONSE);
        assert_eq!(
            body["error"],
            "OPENAI_API_KEY environment variable is not set"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_maps_to_gateway_timeout() {
        let fake = FakeJobService::with_statuses(vec![JobStatus::Running]);
        let (status, Json(body)) =
            chat(State(state_with(Some(fake.clone()))), request(Some("slow"))).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "retry_budget_exhausted");
        assert_eq!(fake.status_calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_writes_one_terminal_object() {
        let fake = FakeJobService::with_reply(vec![JobStatus::Completed], "Done【2】");
        let resp = chat_stream(State(state_with(Some(fake))), request(Some("hi"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"response": "Done"}));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_reports_failures_with_the_shared_error_body() {
        let fake = FakeJobService::with_statuses(vec![JobStatus::Cancelled]);
        let resp = chat_stream(State(state_with(Some(fake))), request(Some("hi"))).await;

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            error_body(&AssistantError::UpstreamJobFailed {
                status: JobStatus::Cancelled
            })
        );
        assert_eq!(body["error"], "Run ended with status: cancelled");
    }

    #[tokio::test]
    async fn stream_validates_before_streaming() {
        let fake = FakeJobService::default();
        let resp = chat_stream(State(state_with(Some(fake.clone()))), request(None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fake.total_calls(), 0);
    }

    async fn render_payload(
        content_type: &str,
        body: &'static str,
    ) -> Result<Json<RenderRequest>, JsonRejection> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/render")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        Json::<RenderRequest>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn render_endpoint_returns_markup() {
        let payload = render_payload("application/json", r#"{"text":"**Scope 1**"}"#).await;
        let (status, Json(body)) = render(payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["html"], "<strong>Scope 1</strong>");
    }

    #[tokio::test]
    async fn render_without_text_is_empty() {
        let payload = render_payload("application/json", "{}").await;
        let (status, Json(body)) = render(payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["html"], "");
    }

    #[tokio::test]
    async fn render_rejects_malformed_body_with_error_shape() {
        for (content_type, raw) in [
            ("application/json", "{\"text\": "),
            ("application/json", r#"{"text": 42}"#),
            ("text/plain", r#"{"text":"hi"}"#),
        ] {
            let payload = render_payload(content_type, raw).await;
            assert!(payload.is_err());
            let (status, Json(body)) = render(payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["response"], INVALID_RENDER_BODY);
            assert_eq!(body["code"], "invalid_input");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn status_reports_polling_policy() {
        let Json(body) = status(State(state_with(None))).await;
        assert_eq!(body["openai"]["configured"], false);
        assert_eq!(body["polling"]["max_attempts"], 10);
        assert_eq!(body["polling"]["initial_delay_ms"], 1000);
        assert_eq!(body["polling"]["max_delay_ms"], 5000);
    }
}
