//! Warden - Telegram group moderation bot
//!
//! Verifies newcomers, removes freshly created accounts, throttles floods
//! and keeps a warning ledger per member.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `moderation` - Decision engine (policies, challenges, counters, warnings)
//! - `database` - MongoDB and in-memory stores
//! - `cache` - LRU-based caching with Moka
//! - `permissions` - Admin checking with caching
//! - `bot` - Telegram glue (with Throttle for API rate limiting)
//! - `plugins` - Command handlers
//! - `events` - Event adapters feeding the engine
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod database;
mod events;
mod moderation;
mod permissions;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cache::CacheRegistry;
use config::{Config, StorageBackend};
use database::{Database, MemoryStore, ModerationStore, MongoStore};
use moderation::{ExpirySweeper, ModerationEngine};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warden=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Warden bot...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}, storage: {:?}", config.bot_mode, config.storage);

    let store: Arc<dyn ModerationStore> = match config.storage {
        StorageBackend::MongoDb => {
            let uri = config.mongodb_uri.as_deref().unwrap_or_default();
            info!("Connecting to MongoDB...");
            let db = Database::connect(uri, &config.mongodb_database).await?;
            db.ensure_indexes().await?;
            info!("Database connected");
            Arc::new(MongoStore::new(&db))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, moderation state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let cache = CacheRegistry::new();

    // Throttle respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    // - 20 messages per minute to the same group
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let actions = Arc::new(bot::TelegramActions::new(bot.clone()));
    let engine = Arc::new(ModerationEngine::new(
        store,
        actions,
        &cache,
        config.engine_settings(),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let sweeper = ExpirySweeper::new(engine.clone()).spawn(shutdown_rx);

    let state = bot::AppState::new(&bot, engine, &cache, config.owner_ids.clone());
    let dispatcher = bot::build_dispatcher(bot.clone(), state);
    let result = bot::run(&config, bot, dispatcher).await;

    info!("Shutting down...");
    let _ = shutdown_tx.send(());
    if let Err(e) = sweeper.await {
        warn!("Expiry sweeper ended abnormally: {}", e);
    }

    result
}
