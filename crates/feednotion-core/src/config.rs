use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::{Error, Result};

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_MAX_OUTPUT_TOKENS: &str = "GEMINI_MAX_OUTPUT_TOKENS";
pub const ENV_NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_RSS_FEED_URL: &str = "RSS_FEED_URL";
pub const ENV_SCHEDULE_INTERVAL_MINUTES: &str = "SCHEDULE_INTERVAL_MINUTES";
pub const ENV_MAX_ARTICLES_TO_PROCESS: &str = "MAX_ARTICLES_TO_PROCESS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const ENV_HTTP_PROXY_URL: &str = "HTTP_PROXY_URL";
pub const ENV_LOG_FILE: &str = "LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub ai: AiConfig,
    pub notion: NotionConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone)]
pub struct GeneralConfig {
    /// Append-only log file path
    pub log_file: PathBuf,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl GeneralConfig {
    /// Load only the logging settings, so logging can start before full validation
    pub fn load() -> Self {
        try_load_dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_file: optional(lookup, ENV_LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(default_log_file),
            log_level: optional(lookup, ENV_LOG_LEVEL).unwrap_or_else(default_log_level),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model name
    pub gemini_model: String,
    /// Max output tokens for a summary
    pub max_output_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotionConfig {
    /// Notion integration token
    pub api_key: String,
    /// Target database; must have Title (title), Summary (rich text) and URL (url) columns
    pub database_id: String,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// RSS/Atom feed to poll
    pub feed_url: String,
    /// Minutes between job runs
    pub schedule_interval_minutes: u64,
    /// Entries taken from the top of the feed on each run
    pub max_articles: usize,
    /// Request timeout in seconds, shared by all outbound HTTP calls
    pub request_timeout_secs: u64,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    pub proxy_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            schedule_interval_minutes: default_schedule_interval(),
            max_articles: default_max_articles(),
            request_timeout_secs: default_timeout(),
            proxy_url: None,
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("app.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_feed_url() -> String {
    "https://news.buzzing.cc/feed.xml".to_string()
}

const MAX_SCHEDULE_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn default_schedule_interval() -> u64 {
    10
}

fn default_max_articles() -> usize {
    3
}

fn default_timeout() -> u64 {
    10
}

/// Read a required variable, treating blank values as missing
fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", key)))
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a positive number, falling back to the default on garbage or zero
fn positive_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq + Display + Copy,
{
    let Some(raw) = optional(lookup, key) else {
        return default;
    };

    match raw.parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => {
            tracing::warn!("Invalid value for {}: {:?}, using default {}", key, raw, default);
            default
        }
    }
}

/// Interval in minutes, capped at one year
fn schedule_minutes<F>(lookup: &F) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let minutes = positive_or_default(lookup, ENV_SCHEDULE_INTERVAL_MINUTES, default_schedule_interval());
    if minutes > MAX_SCHEDULE_INTERVAL_MINUTES {
        tracing::warn!(
            "Invalid value for {}: {} exceeds {}, using default {}",
            ENV_SCHEDULE_INTERVAL_MINUTES,
            minutes,
            MAX_SCHEDULE_INTERVAL_MINUTES,
            default_schedule_interval()
        );
        return default_schedule_interval();
    }
    minutes
}

impl AppConfig {
    /// Load configuration from `.env` files and the process environment
    pub fn load() -> Result<Self> {
        try_load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = required(&lookup, ENV_GEMINI_API_KEY)?;
        let notion_api_key = required(&lookup, ENV_NOTION_API_KEY)?;
        let database_id = required(&lookup, ENV_NOTION_DATABASE_ID)?;

        let feed_url = optional(&lookup, ENV_RSS_FEED_URL).unwrap_or_else(default_feed_url);
        Url::parse(&feed_url)
            .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", ENV_RSS_FEED_URL, feed_url, e)))?;

        Ok(Self {
            general: GeneralConfig::from_lookup(&lookup),
            ai: AiConfig {
                gemini_api_key,
                gemini_model: optional(&lookup, ENV_GEMINI_MODEL).unwrap_or_else(default_gemini_model),
                max_output_tokens: positive_or_default(
                    &lookup,
                    ENV_GEMINI_MAX_OUTPUT_TOKENS,
                    default_max_output_tokens(),
                ),
            },
            notion: NotionConfig {
                api_key: notion_api_key,
                database_id,
            },
            sync: SyncConfig {
                feed_url,
                schedule_interval_minutes: schedule_minutes(&lookup),
                max_articles: positive_or_default(&lookup, ENV_MAX_ARTICLES_TO_PROCESS, default_max_articles()),
                request_timeout_secs: positive_or_default(&lookup, ENV_REQUEST_TIMEOUT_SECS, default_timeout()),
                proxy_url: optional(&lookup, ENV_HTTP_PROXY_URL),
            },
        })
    }

    /// Time between two job runs
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.sync.schedule_interval_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }
}

/// Load the first `.env` found; variables already in the environment win
fn try_load_dotenv() {
    // 1. Current directory
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // 2. ~/.config/feednotion/.env
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("feednotion").join(".env");
        if path.exists() && dotenvy::from_path(&path).is_ok() {
            return;
        }
    }

    // Nothing found is fine, the variables may come from the environment
}
