//! Transient notices and message cleanup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::actions::{ChatActions, MessageRef};

pub struct Notifier {
    actions: Arc<dyn ChatActions>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(actions: Arc<dyn ChatActions>, ttl: Duration) -> Self {
        Self { actions, ttl }
    }

    /// Deliver `text` and delete it again after the notice TTL.
    pub async fn notify(&self, chat_id: i64, text: &str) {
        let notice = match self.actions.deliver(chat_id, text).await {
            Ok(notice) => notice,
            Err(e) => {
                warn!("Failed to deliver notice in {}: {}", chat_id, e);
                return;
            }
        };

        let actions = self.actions.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = actions.delete_message(notice).await {
                debug!("Failed to delete notice {:?}: {}", notice, e);
            }
        });
    }

    /// Deliver a message that stays.
    pub async fn send(&self, chat_id: i64, text: &str) -> Option<MessageRef> {
        match self.actions.deliver(chat_id, text).await {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("Failed to deliver message in {}: {}", chat_id, e);
                None
            }
        }
    }

    /// Delete a message, returning whether it worked.
    pub async fn discard(&self, message: MessageRef) -> bool {
        match self.actions.delete_message(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to delete message {:?}: {}", message, e);
                false
            }
        }
    }
}

/// Notice texts.
pub mod texts {
    use crate::utils::html_escape;

    pub fn challenge_pending(name: &str) -> String {
        format!("🔒 {}, please complete the verification first.", html_escape(name))
    }

    pub fn cooldown(name: &str, remaining_secs: u64) -> String {
        format!(
            "⏳ {}, you can post again in {} s.",
            html_escape(name),
            remaining_secs
        )
    }

    pub fn young_account(name: &str, min_days: u32) -> String {
        format!(
            "❌ {}, your comment was removed. Accounts must be at least {} days old to comment.",
            html_escape(name),
            min_days
        )
    }

    pub fn flood_warning(name: &str, warnings: u32, max_warnings: u32) -> String {
        format!(
            "⚠️ {}, slow down! Warning {}/{}.",
            html_escape(name),
            warnings,
            max_warnings
        )
    }

    pub fn flood_removed(name: &str) -> String {
        format!("🚫 {} was removed for flooding.", html_escape(name))
    }

    pub fn spam(name: &str) -> String {
        format!(
            "❌ {}, links and advertising are not allowed from new accounts.",
            html_escape(name)
        )
    }
}
