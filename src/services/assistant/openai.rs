use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::error::AssistantError;
use super::traits::{JobBoxFuture, JobService};
use super::types::{AssistantMessage, JobStatus, MessageContent};
use crate::utils::log_helpers::truncate_log;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<Value>,
}

/// Assistants API client (threads, runs, messages).
#[derive(Clone)]
pub struct OpenAiJobService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiJobService {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, op: &str) -> Result<Value, AssistantError> {
        let resp = request
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .send()
            .await
            .map_err(|e| {
                error!("[OPENAI] {} send failed: {}", op, e);
                AssistantError::Transport(e.to_string())
            })?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;
        if !status.is_success() {
            let err_text = truncate_log(&raw, 2000);
            error!("[OPENAI] {} failed: status={}, error={}", op, status, err_text);
            return Err(AssistantError::Transport(format!("status {}: {}", status, err_text)));
        }

        serde_json::from_str(&raw).map_err(|err| {
            AssistantError::UnexpectedResponse(format!(
                "invalid JSON from {} (status {}): {}; body_preview={}",
                op,
                status,
                err,
                truncate_log(&raw, 1200)
            ))
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, op: &str) -> Result<T, AssistantError> {
    serde_json::from_value(value)
        .map_err(|err| AssistantError::UnexpectedResponse(format!("unexpected {} payload: {}", op, err)))
}

fn parse_content_part(part: &Value) -> MessageContent {
    match part.get("type").and_then(|v| v.as_str()).unwrap_or("") {
        "text" => MessageContent::Text(
            part.get("text")
                .and_then(|t| t.get("value"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        ),
        "image_file" => MessageContent::ImageFile,
        "image_url" => MessageContent::ImageUrl,
        other => MessageContent::Other(other.to_string()),
    }
}

fn parse_messages(list: MessageList) -> Vec<AssistantMessage> {
    list.data
        .into_iter()
        .map(|m| AssistantMessage {
            role: m.role,
            content: m.content.iter().map(parse_content_part).collect(),
        })
        .collect()
}

impl JobService for OpenAiJobService {
    fn create_thread<'a>(
        &'a self,
        user_message: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>> {
        Box::pin(async move {
            let payload = json!({
                "messages": [{"role": "user", "content": user_message}]
            });
            let val = self
                .send(self.client.post(self.url("threads")).json(&payload), "create_thread")
                .await?;
            Ok(decode::<IdResponse>(val, "thread")?.id)
        })
    }

    fn start_run<'a>(
        &'a self,
        thread_id: &'a str,
        assistant_id: &'a str,
        instructions: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>> {
        Box::pin(async move {
            let payload = json!({
                "assistant_id": assistant_id,
                "instructions": instructions,
            });
            let url = self.url(&format!("threads/{}/runs", thread_id));
            let val = self
                .send(self.client.post(url).json(&payload), "start_run")
                .await?;
            Ok(decode::<IdResponse>(val, "run")?.id)
        })
    }

    fn run_status<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> JobBoxFuture<'a, Result<JobStatus, AssistantError>> {
        Box::pin(async move {
            let url = self.url(&format!("threads/{}/runs/{}", thread_id, run_id));
            let val = self.send(self.client.get(url), "run_status").await?;
            let run = decode::<RunResponse>(val, "run")?;
            Ok(JobStatus::from_wire(&run.status))
        })
    }

    fn list_messages<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> JobBoxFuture<'a, Result<Vec<AssistantMessage>, AssistantError>> {
        Box::pin(async move {
            let url = self.url(&format!("threads/{}/messages", thread_id));
            let val = self
                .send(self.client.get(url).query(&[("order", "desc")]), "list_messages")
                .await?;
            Ok(parse_messages(decode::<MessageList>(val, "message list")?))
        })
    }
}
