//! Outbound actions against the chat platform.

use async_trait::async_trait;
use thiserror::Error;

use super::events::Participant;

/// A delivered message that may later be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// An external action was refused or could not be delivered.
#[derive(Debug, Error)]
#[error("{action} failed in chat {chat_id}: {reason}")]
pub struct ActionError {
    pub action: &'static str,
    pub chat_id: i64,
    pub reason: String,
}

impl ActionError {
    pub fn new(action: &'static str, chat_id: i64, reason: impl ToString) -> Self {
        Self {
            action,
            chat_id,
            reason: reason.to_string(),
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

/// Transport used by the engine. Implementations are mechanical: every
/// decision has already been made when one of these is called.
#[async_trait]
pub trait ChatActions: Send + Sync {
    /// Post the verification prompt for `participant`.
    async fn send_challenge(
        &self,
        chat_id: i64,
        participant: &Participant,
        timeout_minutes: u32,
    ) -> ActionResult<MessageRef>;

    /// Grant or revoke the right to post.
    async fn restrict(&self, chat_id: i64, user_id: u64, can_post: bool) -> ActionResult<()>;

    /// Ban then immediately unban, so the participant leaves but may rejoin.
    async fn remove(&self, chat_id: i64, user_id: u64) -> ActionResult<()>;

    /// Send an HTML-formatted message.
    async fn deliver(&self, chat_id: i64, text: &str) -> ActionResult<MessageRef>;

    async fn delete_message(&self, message: MessageRef) -> ActionResult<()>;
}
