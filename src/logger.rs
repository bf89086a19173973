use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

pub const CHAT_LOG_PREFIX: &str = "assistant-chat.log";
pub const ERROR_LOG_PREFIX: &str = "assistant-chat-error.log";

/// Where and how much the chat server logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: String,
    pub retention_days: u64,
}

impl LogSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            dir: PathBuf::from(&cfg.log_dir),
            level: cfg.log_level.clone(),
            retention_days: parse_keep_days(&cfg.log_max_files),
        }
    }
}

static LOG_GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Stdout for operators, a daily JSON file with every turn, and a second
/// JSON file holding only errors (failed runs, transport errors, panics).
pub fn init_logger(settings: &LogSettings) -> Result<(), String> {
    let removed = prepare_log_dir(&settings.dir, settings.retention_days)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    let (chat_writer, chat_guard) =
        tracing_appender::non_blocking(rolling::daily(&settings.dir, CHAT_LOG_PREFIX));
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(rolling::daily(&settings.dir, ERROR_LOG_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(chat_writer),
        )
        .with(
            fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_writer(error_writer)
                .with_filter(tracing_subscriber::filter::LevelFilter::ERROR),
        )
        .try_init()
        .map_err(|e| format!("install subscriber failed: {e}"))?;

    let _ = LOG_GUARDS.set((chat_guard, error_guard));
    install_panic_hook();

    tracing::info!(
        "[LOG] writing to {} (retention={}d, removed {} stale files)",
        settings.dir.display(),
        settings.retention_days,
        removed
    );
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic occurred".to_string());
        tracing::error!(panic = %payload, location = %location, "[PANIC] request task panicked");
    }));
}

/// Creates the log directory and drops this server's rolled files older
/// than the retention window. Returns how many files were removed.
pub fn prepare_log_dir(dir: &Path, retention_days: u64) -> Result<usize, String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("create log dir {} failed: {e}", dir.display()))?;
    if retention_days == 0 {
        return Ok(0);
    }
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(retention_days * 24 * 3600))
    else {
        return Ok(0);
    };
    let entries = fs::read_dir(dir).map_err(|e| format!("read log dir failed: {e}"))?;

    let mut removed = 0;
    for entry in entries.flatten() {
        if !is_rolled_log(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified < cutoff && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

// LOG_DIR may point at a shared directory; only touch files we rolled.
fn is_rolled_log(name: &str) -> bool {
    name.starts_with(CHAT_LOG_PREFIX) || name.starts_with(ERROR_LOG_PREFIX)
}

fn parse_keep_days(value: &str) -> u64 {
    let raw = value.trim().to_lowercase();
    raw.strip_suffix('d').unwrap_or(raw.as_str()).parse::<u64>().unwrap_or(0)
}
