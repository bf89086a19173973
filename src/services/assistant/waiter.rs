use tracing::{debug, info, warn};

use super::backoff::BackoffSchedule;
use super::error::AssistantError;
use super::traits::JobService;
use super::types::{JobHandle, JobStatus, PollPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Polling,
    Succeeded,
    FailedUpstream(JobStatus),
    FailedTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub polls: u32,
}

/// Polls the run until it reaches a terminal status or the attempt budget
/// runs out. Poll first, then sleep; no sleep follows the final poll.
pub async fn wait_for_completion<S>(
    service: &S,
    handle: &JobHandle,
    policy: &PollPolicy,
) -> Result<WaitOutcome, AssistantError>
where
    S: JobService + ?Sized,
{
    let mut schedule = BackoffSchedule::new(policy);

    loop {
        schedule.record_attempt();
        let status = service
            .run_status(&handle.thread_id, &handle.run_id)
            .await
            .map_err(|err| {
                warn!(
                    "[WAIT] status query failed: thread={}, run={}, attempt={}, error={}",
                    handle.thread_id,
                    handle.run_id,
                    schedule.attempts(),
                    err
                );
                err
            })?;

        let state = transition(status, schedule.exhausted());
        debug!(
            "[WAIT] poll: run={}, attempt={}/{}, status={}, state={:?}",
            handle.run_id,
            schedule.attempts(),
            schedule.max_attempts(),
            status,
            state
        );

        match state {
            WaitState::Polling => tokio::time::sleep(schedule.next_delay()).await,
            WaitState::Succeeded => {
                info!(
                    "[WAIT] run completed: run={}, polls={}",
                    handle.run_id,
                    schedule.attempts()
                );
                return Ok(WaitOutcome {
                    polls: schedule.attempts(),
                });
            }
            WaitState::FailedUpstream(status) => {
                warn!(
                    "[WAIT] run ended unsuccessfully: run={}, status={}",
                    handle.run_id, status
                );
                return Err(AssistantError::UpstreamJobFailed { status });
            }
            WaitState::FailedTimeout => {
                warn!(
                    "[WAIT] retry budget exhausted: run={}, attempts={}, last_status={}",
                    handle.run_id,
                    schedule.attempts(),
                    status
                );
                return Err(AssistantError::RetryBudgetExhausted {
                    attempts: schedule.attempts(),
                });
            }
        }
    }
}

/// Next state after one poll. A non-terminal status on the last allowed
/// poll ends the wait.
fn transition(status: JobStatus, budget_spent: bool) -> WaitState {
    if status == JobStatus::Completed {
        WaitState::Succeeded
    } else if status.is_terminal() {
        WaitState::FailedUpstream(status)
    } else if budget_spent {
        WaitState::FailedTimeout
    } else {
        WaitState::Polling
    }
}
