use std::time::Duration;

use super::types::PollPolicy;

pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Retry state for one wait loop: how many polls have been made and the
/// delay to sleep after the next unsuccessful one.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    attempts: u32,
    max_attempts: u32,
    current: Duration,
    ceiling: Duration,
}

impl BackoffSchedule {
    pub fn new(policy: &PollPolicy) -> Self {
        Self {
            attempts: 0,
            max_attempts: policy.max_attempts.max(1),
            current: policy.initial_delay.min(policy.max_delay),
            ceiling: policy.max_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Records one poll. Returns false once the budget is spent.
    pub fn record_attempt(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Delay to sleep now; advances the schedule by the multiplier, clamped
    /// to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(BACKOFF_MULTIPLIER).min(self.ceiling);
        delay
    }
}
