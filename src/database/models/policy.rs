//! Per-conversation moderation policy.
//!
//! One document per chat. Missing fields resolve to the documented defaults
//! at the serde boundary, so older documents keep loading after new
//! settings are introduced.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Default welcome template.
pub const DEFAULT_WELCOME_TEMPLATE: &str = "👋 Welcome, {mention}! Glad to see you in {chat}!";

/// How long a passed challenge keeps a participant verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePolicy {
    /// A single pass verifies the participant for good.
    #[default]
    Persistent,
    /// A pass is valid for `challenge_valid_days`.
    TimeBased,
    /// Every join is challenged.
    Always,
}

impl ChallengePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::TimeBased => "time_based",
            Self::Always => "always",
        }
    }

    /// Accepts the stored names plus `time` as a short form of `time_based`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistent" => Some(Self::Persistent),
            "time_based" | "time" => Some(Self::TimeBased),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

/// Moderation policy for a single chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationPolicy {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Telegram chat ID (indexed)
    pub chat_id: i64,

    /// Master switch for the whole engine in this chat
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Accounts younger than this (whole days) are removed on join. 0 disables.
    #[serde(default = "default_min_account_age_days")]
    pub min_account_age_days: u32,

    /// Flood warnings before removal
    #[serde(default = "default_max_warnings")]
    pub max_warnings: u32,

    #[serde(default = "default_true")]
    pub anti_flood_enabled: bool,

    /// Apply moderation to thread replies (discussion comments)
    #[serde(default = "default_true")]
    pub protect_content: bool,

    #[serde(default)]
    pub cooldown_enabled: bool,

    #[serde(default = "default_true")]
    pub challenge_enabled: bool,

    #[serde(default)]
    pub challenge_policy: ChallengePolicy,

    #[serde(default = "default_challenge_timeout_minutes")]
    pub challenge_timeout_minutes: u32,

    #[serde(default = "default_challenge_max_attempts")]
    pub challenge_max_attempts: u32,

    /// Validity window for `ChallengePolicy::TimeBased`
    #[serde(default = "default_challenge_valid_days")]
    pub challenge_valid_days: u32,

    /// Supports `{name}`, `{mention}`, `{chat}` and `{rules}`
    #[serde(default = "default_welcome_template")]
    pub welcome_template: String,

    /// Delete the "user joined" service message after processing
    #[serde(default = "default_true")]
    pub delete_service_messages: bool,
}

fn default_true() -> bool {
    true
}

fn default_min_account_age_days() -> u32 {
    1
}

fn default_max_warnings() -> u32 {
    3
}

fn default_challenge_timeout_minutes() -> u32 {
    10
}

fn default_challenge_max_attempts() -> u32 {
    3
}

fn default_challenge_valid_days() -> u32 {
    30
}

fn default_welcome_template() -> String {
    DEFAULT_WELCOME_TEMPLATE.to_string()
}

impl ConversationPolicy {
    /// The built-in policy used for unseen chats and as the storage fallback.
    pub fn defaults(chat_id: i64) -> Self {
        Self {
            id: None,
            chat_id,
            enabled: true,
            min_account_age_days: default_min_account_age_days(),
            max_warnings: default_max_warnings(),
            anti_flood_enabled: true,
            protect_content: true,
            cooldown_enabled: false,
            challenge_enabled: true,
            challenge_policy: ChallengePolicy::Persistent,
            challenge_timeout_minutes: default_challenge_timeout_minutes(),
            challenge_max_attempts: default_challenge_max_attempts(),
            challenge_valid_days: default_challenge_valid_days(),
            welcome_template: default_welcome_template(),
            delete_service_messages: true,
        }
    }

    /// Warning threshold, never below one.
    pub fn warning_limit(&self) -> u32 {
        self.max_warnings.max(1)
    }

    /// Attempt limit for a new challenge, never below one.
    pub fn attempt_limit(&self) -> u32 {
        self.challenge_max_attempts.max(1)
    }
}
