//! Abuse counter records (flood window, message cooldown, warnings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sliding flood window for one user in a chat.
///
/// `window_start` is the time of the last counted message; the running
/// `count` survives as long as consecutive gaps stay within the window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloodCounter {
    pub chat_id: i64,
    pub user_id: u64,
    pub count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub window_start: DateTime<Utc>,
}

impl FloodCounter {
    pub fn first(chat_id: i64, user_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            user_id,
            count: 1,
            window_start: now,
        }
    }

    /// Whether the window has lapsed relative to `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.window_start < cutoff
    }
}

/// Last accepted post for one user in a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CooldownRecord {
    pub chat_id: i64,
    pub user_id: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_post_at: DateTime<Utc>,
}

/// Accumulated violations for one user in a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarningLedgerEntry {
    pub chat_id: i64,
    pub user_id: u64,
    pub count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_warning_at: DateTime<Utc>,
}
