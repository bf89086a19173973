use std::fmt;
use std::time::Duration;

/// Identifies one run on one thread of the hosted assistant service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub thread_id: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl JobStatus {
    /// Maps a run status reported by the hosted API. Anything that is not
    /// one of the four terminal states keeps the waiter polling.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "queued" | "pending" => JobStatus::Pending,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "expired" => JobStatus::Expired,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Running,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Expired => "expired",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Expired | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    ImageFile,
    ImageUrl,
    Other(String),
}

impl MessageContent {
    pub fn kind(&self) -> &str {
        match self {
            MessageContent::Text(_) => "text",
            MessageContent::ImageFile => "image_file",
            MessageContent::ImageUrl => "image_url",
            MessageContent::Other(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantMessage {
    pub role: String,
    pub content: Vec<MessageContent>,
}

/// Fixed assistant configuration every run is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantPersona {
    pub assistant_id: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}
