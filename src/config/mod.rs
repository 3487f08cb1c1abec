//! Configuration module for the Warden bot.
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::moderation::EngineSettings;

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Where moderation state is kept
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    MongoDb,
    /// Process memory; state is lost on restart
    Memory,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Owner user IDs (comma-separated)
    /// These users may run admin commands in any chat.
    pub owner_ids: Vec<u64>,

    // Storage
    pub storage: StorageBackend,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,

    // Engine
    pub flood_window_secs: u64,
    pub flood_limit: u32,
    pub cooldown_secs: u64,
    pub notice_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub sweep_first_delay_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or a value does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        // Validate webhook URL is set if mode is webhook
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            bail!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let storage = match env::var("STORAGE")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "mongodb" | "mongo" => StorageBackend::MongoDb,
            other => bail!("Unknown STORAGE backend: {}", other),
        };

        let mongodb_uri = env::var("MONGODB_URI").ok().filter(|s| !s.is_empty());
        if storage == StorageBackend::MongoDb && mongodb_uri.is_none() {
            bail!("MONGODB_URI must be set when STORAGE is mongodb");
        }

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            bot_mode,
            webhook_url,
            webhook_port: parse_var("WEBHOOK_PORT", 8443)?,
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            owner_ids: parse_owner_ids(&env::var("OWNER_IDS").unwrap_or_default()),
            storage,
            mongodb_uri,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "warden".to_string()),
            flood_window_secs: parse_var("FLOOD_WINDOW_SECS", 10)?,
            flood_limit: parse_var("FLOOD_LIMIT", 5)?,
            cooldown_secs: parse_var("COOLDOWN_SECS", 30)?,
            notice_ttl_secs: parse_var("NOTICE_TTL_SECS", 5)?,
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", 60)?,
            sweep_first_delay_secs: parse_var("SWEEP_FIRST_DELAY_SECS", 10)?,
        })
    }

    /// Engine tunables derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            flood_window: Duration::from_secs(self.flood_window_secs),
            flood_limit: self.flood_limit,
            cooldown: Duration::from_secs(self.cooldown_secs),
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
            // A zero period would make the sweeper's ticker panic
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
            sweep_first_delay: Duration::from_secs(self.sweep_first_delay_secs),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", name, value)),
        _ => Ok(default),
    }
}

fn parse_owner_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}
