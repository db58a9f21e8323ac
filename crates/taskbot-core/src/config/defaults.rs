//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "taskbot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.taskbot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_db_path() -> String {
    "~/.taskbot/data/tasks.db".to_string()
}

pub fn default_analyzer() -> String {
    "openai".to_string()
}

pub fn default_nagger() -> String {
    "gemini".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Asia/Dubai, UTC+4.
pub fn default_utc_offset_minutes() -> i32 {
    240
}

/// 10:00 local time, every day.
pub fn default_digest_cron() -> String {
    "0 0 10 * * *".to_string()
}

pub fn default_digest_every_days() -> u32 {
    1
}

pub fn default_nag_window_start() -> String {
    "12:00".to_string()
}

pub fn default_nag_window_end() -> String {
    "20:00".to_string()
}

pub fn default_cleanup_interval_mins() -> u64 {
    60
}

pub fn default_max_messages_per_hour() -> i64 {
    30
}
