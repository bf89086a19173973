use std::time::Duration;

use tracing::{error, info};

use crate::services::assistant::error::AssistantError;

pub fn log_turn_begin(turn_id: &str, assistant_id: &str, message_chars: usize) {
    info!(
        "[CHAT] begin: turn={}, assistant={}, messageChars={}",
        turn_id, assistant_id, message_chars
    );
}

pub fn log_turn_finish(turn_id: &str, polls: u32, elapsed: Duration, reply_chars: usize) {
    info!(
        "[CHAT] finish: turn={}, polls={}, elapsedMs={}, replyChars={}",
        turn_id,
        polls,
        elapsed.as_millis(),
        reply_chars
    );
}

pub fn log_turn_error(turn_id: &str, err: &AssistantError) {
    error!("[CHAT] error: turn={}, code={}, error={}", turn_id, err.code(), err);
}

/// Cuts `value` to at most `max_len` bytes on a char boundary.
pub fn truncate_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = value[..end].to_string();
    out.push_str("...[truncated]");
    out
}
