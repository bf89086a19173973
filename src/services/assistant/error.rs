use axum::http::StatusCode;
use thiserror::Error;

use super::types::JobStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("OPENAI_API_KEY environment variable is not set")]
    MissingCredential,
    #[error("Run ended with status: {status}")]
    UpstreamJobFailed { status: JobStatus },
    #[error("Maximum retries reached while waiting for run completion ({attempts} attempts)")]
    RetryBudgetExhausted { attempts: u32 },
    #[error("{0}")]
    UnexpectedResponse(String),
    #[error("assistant service request failed: {0}")]
    Transport(String),
}

impl AssistantError {
    pub fn code(&self) -> &'static str {
        match self {
            AssistantError::InvalidInput(_) => "invalid_input",
            AssistantError::MissingCredential => "missing_credential",
            AssistantError::UpstreamJobFailed { .. } => "upstream_job_failed",
            AssistantError::RetryBudgetExhausted { .. } => "retry_budget_exhausted",
            AssistantError::UnexpectedResponse(_) => "unexpected_response",
            AssistantError::Transport(_) => "transport_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AssistantError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AssistantError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            AssistantError::UpstreamJobFailed { .. }
            | AssistantError::UnexpectedResponse(_)
            | AssistantError::Transport(_) => StatusCode::BAD_GATEWAY,
            AssistantError::RetryBudgetExhausted { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
