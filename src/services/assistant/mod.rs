pub mod backoff;
pub mod error;
pub mod formatter;
pub mod openai;
pub mod submitter;
pub mod traits;
pub mod types;
pub mod waiter;

#[cfg(test)]
pub mod testing;

use std::time::Instant;

use uuid::Uuid;

use crate::core::validation::normalize_non_empty_str;
use crate::utils::log_helpers::{log_turn_begin, log_turn_error, log_turn_finish};

use self::error::AssistantError;
use self::formatter::extract_reply;
use self::submitter::submit_job;
use self::traits::JobService;
use self::types::{AssistantPersona, PollPolicy};
use self::waiter::wait_for_completion;

pub const NO_MESSAGE_PROVIDED: &str = "No message provided";

/// One chat turn: submit the message, wait for the run, return the cleaned
/// reply.
pub async fn run_chat_turn<S>(
    service: &S,
    persona: &AssistantPersona,
    policy: &PollPolicy,
    raw_message: Option<&str>,
) -> Result<String, AssistantError>
where
    S: JobService + ?Sized,
{
    let message = raw_message
        .and_then(normalize_non_empty_str)
        .ok_or_else(|| AssistantError::InvalidInput(NO_MESSAGE_PROVIDED.to_string()))?;

    let turn_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    log_turn_begin(&turn_id, &persona.assistant_id, message.chars().count());

    let result = async {
        let handle = submit_job(service, persona, &message).await?;
        let outcome = wait_for_completion(service, &handle, policy).await?;
        let messages = service.list_messages(&handle.thread_id).await?;
        let reply = extract_reply(&messages)?;
        Ok::<_, AssistantError>((reply, outcome.polls))
    }
    .await;

    match result {
        Ok((reply, polls)) => {
            log_turn_finish(&turn_id, polls, started.elapsed(), reply.chars().count());
            Ok(reply)
        }
        Err(err) => {
            log_turn_error(&turn_id, &err);
            Err(err)
        }
    }
}
