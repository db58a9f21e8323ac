mod channels;
mod defaults;
mod prompts;
mod providers;


pub use channels::*;
pub use prompts::*;
pub use providers::*;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::TaskbotError;
use defaults::*;

/// Top-level taskbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub chatter: ChatterConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for a daily rolling log file. `None` = stderr only.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Scheduler configuration -- the task digest and the random nag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Offset from UTC that cron expressions and the nag window are read in.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Cron expression for the task digest (5 or 6 fields, local time).
    #[serde(default = "default_digest_cron")]
    pub digest_cron: String,
    /// Send the digest only on every Nth day (1 = daily, 2 = every two days).
    #[serde(default = "default_digest_every_days")]
    pub digest_every_days: u32,
    #[serde(default = "default_true")]
    pub nag_enabled: bool,
    /// Start of the daily nag window, "HH:MM" local time.
    #[serde(default = "default_nag_window_start")]
    pub nag_window_start: String,
    /// End of the daily nag window (exclusive), "HH:MM" local time.
    #[serde(default = "default_nag_window_end")]
    pub nag_window_end: String,
    /// How often old message counters are pruned.
    #[serde(default = "default_cleanup_interval_mins")]
    pub cleanup_interval_mins: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            utc_offset_minutes: default_utc_offset_minutes(),
            digest_cron: default_digest_cron(),
            digest_every_days: default_digest_every_days(),
            nag_enabled: true,
            nag_window_start: default_nag_window_start(),
            nag_window_end: default_nag_window_end(),
            cleanup_interval_mins: default_cleanup_interval_mins(),
        }
    }
}

/// Chatter guard -- the once-per-hour "too many messages" notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatterConfig {
    /// Messages per chat per hour that trigger the notice. 0 = disabled.
    #[serde(default = "default_max_messages_per_hour")]
    pub max_messages_per_hour: i64,
}

impl Default for ChatterConfig {
    fn default() -> Self {
        Self {
            max_messages_per_hour: default_max_messages_per_hour(),
        }
    }
}

impl Config {
    /// Override secrets and paths from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.channel.telegram.bot_token = token;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.provider.openai.api_key = key;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.provider.gemini.api_key = key;
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.memory.db_path = path;
        }
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<(), TaskbotError> {
        if self.channel.telegram.bot_token.trim().is_empty() {
            return Err(TaskbotError::Config(
                "TELEGRAM_BOT_TOKEN is required (set channel.telegram.bot_token or the env var)"
                    .into(),
            ));
        }
        let sched = &self.scheduler;
        if sched.digest_every_days == 0 {
            return Err(TaskbotError::Config(
                "scheduler.digest_every_days must be at least 1".into(),
            ));
        }
        if sched.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(TaskbotError::Config(format!(
                "scheduler.utc_offset_minutes out of range: {}",
                sched.utc_offset_minutes
            )));
        }
        let start = parse_hhmm(&sched.nag_window_start)?;
        let end = parse_hhmm(&sched.nag_window_end)?;
        if start >= end {
            return Err(TaskbotError::Config(format!(
                "nag window must start before it ends ({} >= {})",
                sched.nag_window_start, sched.nag_window_end
            )));
        }
        for (name, provider) in [
            ("analyzer", &self.provider.analyzer),
            ("nagger", &self.provider.nagger),
        ] {
            if !matches!(provider.as_str(), "openai" | "gemini") {
                return Err(TaskbotError::Config(format!(
                    "unsupported {name} provider: {provider}"
                )));
            }
        }
        Ok(())
    }
}

/// Parse an "HH:MM" time of day.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, TaskbotError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| TaskbotError::Config(format!("invalid time '{value}': {e}")))
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, TaskbotError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| TaskbotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| TaskbotError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
