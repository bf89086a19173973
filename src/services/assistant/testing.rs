use std::sync::{Arc, Mutex};

use super::error::AssistantError;
use super::traits::{JobBoxFuture, JobService};
use super::types::{AssistantMessage, JobStatus, MessageContent};

#[derive(Default)]
struct FakeState {
    statuses: Vec<JobStatus>,
    messages: Vec<AssistantMessage>,
    created_threads: Vec<String>,
    started_runs: Vec<(String, String, String)>,
    status_calls: usize,
    list_calls: usize,
    fail_create: bool,
    fail_status_on_call: Option<usize>,
}

/// Scripted job service. Status queries walk the scripted list and then
/// keep returning its last entry.
#[derive(Clone, Default)]
pub struct FakeJobService {
    state: Arc<Mutex<FakeState>>,
}

impl FakeJobService {
    pub fn with_statuses(statuses: Vec<JobStatus>) -> Self {
        let service = Self::default();
        service.state.lock().unwrap().statuses = statuses;
        service
    }

    pub fn with_reply(statuses: Vec<JobStatus>, reply: &str) -> Self {
        let service = Self::with_statuses(statuses);
        service.set_messages(vec![AssistantMessage {
            role: "assistant".to_string(),
            content: vec![MessageContent::Text(reply.to_string())],
        }]);
        service
    }

    pub fn set_messages(&self, messages: Vec<AssistantMessage>) {
        self.state.lock().unwrap().messages = messages;
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn fail_status_on_call(&self, call: usize) {
        self.state.lock().unwrap().fail_status_on_call = Some(call);
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.state.lock().unwrap().created_threads.clone()
    }

    pub fn started_runs(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().started_runs.clone()
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.created_threads.len() + state.started_runs.len() + state.status_calls + state.list_calls
    }
}

impl JobService for FakeJobService {
    fn create_thread<'a>(
        &'a self,
        user_message: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.created_threads.push(user_message.to_string());
            if state.fail_create {
                return Err(AssistantError::Transport("status 503: unavailable".to_string()));
            }
            Ok(format!("thread_{}", state.created_threads.len()))
        })
    }

    fn start_run<'a>(
        &'a self,
        thread_id: &'a str,
        assistant_id: &'a str,
        instructions: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.started_runs.push((
                thread_id.to_string(),
                assistant_id.to_string(),
                instructions.to_string(),
            ));
            Ok(format!("run_{}", state.started_runs.len()))
        })
    }

    fn run_status<'a>(
        &'a self,
        _thread_id: &'a str,
        _run_id: &'a str,
    ) -> JobBoxFuture<'a, Result<JobStatus, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.status_calls += 1;
            if state.fail_status_on_call == Some(state.status_calls) {
                return Err(AssistantError::Transport("connection reset".to_string()));
            }
            let idx = (state.status_calls - 1).min(state.statuses.len().saturating_sub(1));
            Ok(state.statuses.get(idx).copied().unwrap_or(JobStatus::Running))
        })
    }

    fn list_messages<'a>(
        &'a self,
        _thread_id: &'a str,
    ) -> JobBoxFuture<'a, Result<Vec<AssistantMessage>, AssistantError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            Ok(state.messages.clone())
        })
    }
}
