use tracing::info;

use super::error::AssistantError;
use super::traits::JobService;
use super::types::{AssistantPersona, JobHandle};

/// Creates a thread seeded with the user's message and starts a run on it.
/// Nothing here is retried.
pub async fn submit_job<S>(
    service: &S,
    persona: &AssistantPersona,
    user_message: &str,
) -> Result<JobHandle, AssistantError>
where
    S: JobService + ?Sized,
{
    let thread_id = service.create_thread(user_message).await?;
    let run_id = service
        .start_run(&thread_id, &persona.assistant_id, &persona.instructions)
        .await?;
    info!(
        "[SUBMIT] run started: thread={}, run={}, assistant={}",
        thread_id, run_id, persona.assistant_id
    );
    Ok(JobHandle { thread_id, run_id })
}
