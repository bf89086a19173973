use std::future::Future;
use std::pin::Pin;

use super::error::AssistantError;
use super::types::{AssistantMessage, JobStatus};

pub type JobBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Hosted assistant job API: threads, runs and thread messages.
pub trait JobService: Send + Sync {
    /// Creates a thread seeded with one user message, returning its id.
    fn create_thread<'a>(
        &'a self,
        user_message: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>>;

    /// Starts a run on the thread, returning the run id.
    fn start_run<'a>(
        &'a self,
        thread_id: &'a str,
        assistant_id: &'a str,
        instructions: &'a str,
    ) -> JobBoxFuture<'a, Result<String, AssistantError>>;

    fn run_status<'a>(
        &'a self,
        thread_id: &'a str,
        run_id: &'a str,
    ) -> JobBoxFuture<'a, Result<JobStatus, AssistantError>>;

    /// Thread messages, newest first.
    fn list_messages<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> JobBoxFuture<'a, Result<Vec<AssistantMessage>, AssistantError>>;
}
