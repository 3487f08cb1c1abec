//! Moderation action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of logged moderation actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    NewMember,
    UserBlocked,
    WelcomeSent,
    CaptchaIssued,
    CaptchaPassed,
    UserBanned,
    MessagePosted,
    CommentPosted,
    MessageDeleted,
    CommentDeleted,
    ServiceMessageDeleted,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewMember => "new_member",
            Self::UserBlocked => "user_blocked",
            Self::WelcomeSent => "welcome_sent",
            Self::CaptchaIssued => "captcha_issued",
            Self::CaptchaPassed => "captcha_passed",
            Self::UserBanned => "user_banned",
            Self::MessagePosted => "message_posted",
            Self::CommentPosted => "comment_posted",
            Self::MessageDeleted => "message_deleted",
            Self::CommentDeleted => "comment_deleted",
            Self::ServiceMessageDeleted => "service_message_deleted",
        }
    }
}

/// A single logged action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionLogEntry {
    pub chat_id: i64,
    #[serde(default)]
    pub user_id: Option<u64>,
    pub kind: ActionKind,
    #[serde(default)]
    pub detail: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ActionLogEntry {
    pub fn new(
        chat_id: i64,
        user_id: Option<u64>,
        kind: ActionKind,
        detail: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id,
            user_id,
            kind,
            detail: detail.into(),
            timestamp,
        }
    }
}
