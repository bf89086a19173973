use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::services::assistant::types::{AssistantPersona, PollPolicy};

pub const DEFAULT_ASSISTANT_ID: &str = "asst_SizeRJtLIRnks53yEh8G6fU5";
pub const DEFAULT_ASSISTANT_INSTRUCTIONS: &str =
    "You are a helpful assistant that provides information about IFRS S1 & S2 for GCC Businesses.";

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub assistant_id: String,
    pub assistant_instructions: String,
    pub poll_max_attempts: u32,
    pub poll_initial_delay_ms: u64,
    pub poll_max_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub port: u16,
    pub host: String,
    pub log_dir: String,
    pub log_level: String,
    pub log_max_files: String,
    pub cors_origins: Vec<String>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init_global() -> Result<&'static Config, String> {
        let cfg = Config::from_env()?;
        CONFIG
            .set(cfg)
            .map_err(|_| "Config already initialized".to_string())?;
        CONFIG
            .get()
            .ok_or_else(|| "Config not initialized".to_string())
    }

    fn from_env() -> Result<Config, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_u64 = |key: &str, def: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(def)
        };
        let read_str = |key: &str, def: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| def.to_string())
        };

        let openai_api_key = lookup("OPENAI_API_KEY")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let openai_base_url = read_str("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let assistant_id = read_str("ASSISTANT_ID", DEFAULT_ASSISTANT_ID);
        let assistant_instructions =
            read_str("ASSISTANT_INSTRUCTIONS", DEFAULT_ASSISTANT_INSTRUCTIONS);

        let poll_max_attempts = lookup("POLL_MAX_ATTEMPTS")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(10);
        let poll_initial_delay_ms = read_u64("POLL_INITIAL_DELAY_MS", 1000);
        let poll_max_delay_ms = read_u64("POLL_MAX_DELAY_MS", 5000);
        if poll_initial_delay_ms == 0 || poll_max_delay_ms == 0 {
            return Err("POLL_INITIAL_DELAY_MS and POLL_MAX_DELAY_MS must be positive".to_string());
        }
        let http_timeout_secs = read_u64("HTTP_TIMEOUT_SECS", 30);

        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(3001);
        let host = read_str("HOST", "0.0.0.0");

        let log_dir = read_str("LOG_DIR", "logs");
        let log_level = read_str("LOG_LEVEL", "info");
        let log_max_files = read_str("LOG_MAX_FILES", "7d");

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec!["*".to_string()],
        };

        Ok(Config {
            openai_api_key,
            openai_base_url,
            assistant_id,
            assistant_instructions,
            poll_max_attempts,
            poll_initial_delay_ms,
            poll_max_delay_ms,
            http_timeout_secs,
            port,
            host,
            log_dir,
            log_level,
            log_max_files,
            cors_origins,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    pub fn persona(&self) -> AssistantPersona {
        AssistantPersona {
            assistant_id: self.assistant_id.clone(),
            instructions: self.assistant_instructions.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts,
            initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
            max_delay: Duration::from_millis(self.poll_max_delay_ms),
        }
    }

    pub fn print(&self) {
        println!("Current configuration:");
        println!("  - PORT: {}", self.port);
        println!("  - HOST: {}", self.host);
        println!("  - OPENAI_BASE_URL: {}", self.openai_base_url);
        println!(
            "  - OPENAI_API_KEY: {}",
            if self.has_api_key() { "set" } else { "NOT SET" }
        );
        println!("  - ASSISTANT_ID: {}", self.assistant_id);
        println!("  - LOG_DIR: {}", self.log_dir);
        println!("  - LOG_LEVEL: {}", self.log_level);
        println!("  - Polling:");
        println!("    • POLL_MAX_ATTEMPTS: {}", self.poll_max_attempts);
        println!("    • POLL_INITIAL_DELAY_MS: {}", self.poll_initial_delay_ms);
        println!("    • POLL_MAX_DELAY_MS: {}", self.poll_max_delay_ms);
        println!("    • HTTP_TIMEOUT_SECS: {}", self.http_timeout_secs);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    pub(crate) fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_match_widget_deployment() {
        let cfg = config_from(&[]).unwrap();
        assert!(!cfg.has_api_key());
        assert_eq!(cfg.assistant_id, DEFAULT_ASSISTANT_ID);
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.cors_origins, vec!["*".to_string()]);

        let policy = cfg.poll_policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let cfg = config_from(&[
            ("OPENAI_API_KEY", " sk-test "),
            ("POLL_MAX_ATTEMPTS", "4"),
            ("POLL_MAX_DELAY_MS", "not-a-number"),
            ("CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("ASSISTANT_INSTRUCTIONS", "   "),
        ])
        .unwrap();
        assert_eq!(cfg.openai_api_key, "sk-test");
        assert_eq!(cfg.poll_max_attempts, 4);
        assert_eq!(cfg.poll_max_delay_ms, 5000);
        assert_eq!(cfg.cors_origins.len(), 2);
        assert_eq!(cfg.persona().instructions, DEFAULT_ASSISTANT_INSTRUCTIONS);
    }

    #[test]
    fn rejects_zero_delays() {
        let err = config_from(&[("POLL_INITIAL_DELAY_MS", "0")]).unwrap_err();
        assert!(err.contains("must be positive"));
    }
}
