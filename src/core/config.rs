//! # Configuration
//!
//! Environment-backed configuration, loaded once at startup. Defaults match
//! the hosted deployment: 30-second notification checks, 100 notifications
//! per user, JST wall clock.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct Config {
    /// Channel access token for the messaging platform push API.
    pub line_channel_token: String,
    /// Optional; without it the semantic resolver strategy is disabled and
    /// only the deterministic parser runs.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Path of the flat JSON notification collection.
    pub storage_path: String,
    pub check_interval_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub max_notifications_per_user: usize,
    /// Wall-clock offset used to interpret user time expressions.
    pub timezone: FixedOffset,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let line_channel_token = std::env::var("LINE_CHANNEL_ACCESS_TOKEN")
            .context("LINE_CHANNEL_ACCESS_TOKEN is required")?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let check_interval_secs: u64 = env_or("NOTIFICATION_CHECK_INTERVAL", "30")
            .parse()
            .context("NOTIFICATION_CHECK_INTERVAL must be an integer")?;
        if check_interval_secs == 0 {
            bail!("NOTIFICATION_CHECK_INTERVAL must be at least 1 second");
        }

        let dispatch_timeout_secs: u64 = env_or("DISPATCH_TIMEOUT_SECS", "10")
            .parse()
            .context("DISPATCH_TIMEOUT_SECS must be an integer")?;
        if dispatch_timeout_secs == 0 {
            bail!("DISPATCH_TIMEOUT_SECS must be at least 1 second");
        }

        let max_notifications_per_user: usize = env_or("MAX_NOTIFICATIONS_PER_USER", "100")
            .parse()
            .context("MAX_NOTIFICATIONS_PER_USER must be an integer")?;
        if max_notifications_per_user == 0 {
            bail!("MAX_NOTIFICATIONS_PER_USER must be at least 1");
        }

        let offset_hours: i32 = env_or("UTC_OFFSET_HOURS", "9")
            .parse()
            .context("UTC_OFFSET_HOURS must be an integer")?;
        let timezone = FixedOffset::east_opt(offset_hours * 3600)
            .context("UTC_OFFSET_HOURS is out of range")?;

        Ok(Config {
            line_channel_token,
            openai_api_key,
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            storage_path: env_or("NOTIFICATION_STORAGE_PATH", "data/notifications.json"),
            check_interval_secs,
            dispatch_timeout_secs,
            max_notifications_per_user,
            timezone,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
