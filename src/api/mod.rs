use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{
    header::{HeaderName, ACCEPT, CONTENT_TYPE, ORIGIN},
    Method, Request, StatusCode,
};
use axum::response::IntoResponse;
use axum::response::Response;
use axum::{Json, Router};
use once_cell::sync::Lazy;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::config::Config;
use crate::services::assistant::error::AssistantError;
use crate::services::assistant::openai::OpenAiJobService;
use crate::services::assistant::traits::JobService;
use crate::services::assistant::types::{AssistantPersona, PollPolicy};

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);
static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub mod chat;

/// Per-process request context. `service` is absent when no credential is
/// configured; every chat turn then fails before submitting anything.
#[derive(Clone)]
pub struct AppState {
    pub service: Option<Arc<dyn JobService>>,
    pub persona: AssistantPersona,
    pub policy: PollPolicy,
    pub base_url: String,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Result<Self, AssistantError> {
        let service = if cfg.has_api_key() {
            let client = OpenAiJobService::new(
                cfg.openai_api_key.clone(),
                cfg.openai_base_url.clone(),
                Duration::from_secs(cfg.http_timeout_secs.max(1)),
            )?;
            Some(Arc::new(client) as Arc<dyn JobService>)
        } else {
            None
        };
        Ok(Self {
            service,
            persona: cfg.persona(),
            policy: cfg.poll_policy(),
            base_url: cfg.openai_base_url.clone(),
        })
    }

    pub fn service(&self) -> Result<Arc<dyn JobService>, AssistantError> {
        self.service
            .clone()
            .ok_or(AssistantError::MissingCredential)
    }
}

/// Wildcard origins get no credentials. Listed origins allow credentials,
/// which tower-http only accepts alongside an explicit method list.
fn cors_layer(cfg: &Config) -> CorsLayer {
    let allowed_headers = [
        ACCEPT,
        CONTENT_TYPE,
        ORIGIN,
        HeaderName::from_static("x-requested-with"),
        HeaderName::from_static("x-request-id"),
    ];

    if cfg.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(allowed_headers)
            .allow_methods(Any)
            .allow_credentials(false)
    } else {
        let origins = cfg
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers(allowed_headers)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_credentials(true)
    }
}

pub fn router(cfg: &Config, state: AppState) -> Router {
    let cors = cors_layer(cfg);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let request_id = header_value(req, &REQUEST_ID_HEADER);
            info_span!(
                "http.request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
                request_id = %request_id
            )
        })
        .on_request(|_req: &Request<Body>, _span: &tracing::Span| {
            info!("request.start");
        })
        .on_response(|res: &Response, latency: Duration, _span: &tracing::Span| {
            info!(status = %res.status(), latency_ms = %latency.as_millis(), "request.end");
        })
        .on_failure(|err, latency: Duration, _span: &tracing::Span| {
            tracing::error!(error = %err, latency_ms = %latency.as_millis(), "request.failure");
        });

    Lazy::force(&START_TIME);

    Router::new()
        .merge(chat::router())
        .route("/health", axum::routing::get(health))
        .route("/", axum::routing::get(root))
        .fallback(fallback_404)
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER.clone()))
        .layer(SetRequestIdLayer::new(
            REQUEST_ID_HEADER.clone(),
            MakeRequestUuid,
        ))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": crate::core::time::now_rfc3339(),
        "uptime": START_TIME.elapsed().as_secs_f64()
    }))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "Assistant Chat Server",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat widget backend proxying questions to a hosted assistant",
        "endpoints": {
            "health": "/health",
            "chat": "/api/chat",
            "chat_stream": "/api/chat/stream",
            "render": "/api/chat/render",
            "status": "/api/chat/status"
        }
    }))
}

async fn fallback_404(uri: OriginalUri) -> impl IntoResponse {
    let path = uri.0.path().to_string();
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "message": "The requested resource does not exist",
                "path": path
            }
        })),
    )
}

fn header_value(req: &Request<Body>, name: &HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
