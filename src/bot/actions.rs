//! Telegram implementation of the engine's outbound actions.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
};
use tracing::debug;

use super::dispatcher::ThrottledBot;
use crate::events::captcha;
use crate::moderation::{ActionError, ActionResult, ChatActions, MessageRef, Participant};
use crate::utils::mention;

/// Permissions granted back after a passed challenge.
fn posting_permissions() -> ChatPermissions {
    ChatPermissions::SEND_MESSAGES
        | ChatPermissions::SEND_AUDIOS
        | ChatPermissions::SEND_DOCUMENTS
        | ChatPermissions::SEND_PHOTOS
        | ChatPermissions::SEND_VIDEOS
        | ChatPermissions::SEND_VIDEO_NOTES
        | ChatPermissions::SEND_VOICE_NOTES
        | ChatPermissions::SEND_POLLS
        | ChatPermissions::SEND_OTHER_MESSAGES
        | ChatPermissions::ADD_WEB_PAGE_PREVIEWS
}

pub struct TelegramActions {
    bot: ThrottledBot,
}

impl TelegramActions {
    pub fn new(bot: ThrottledBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatActions for TelegramActions {
    async fn send_challenge(
        &self,
        chat_id: i64,
        participant: &Participant,
        timeout_minutes: u32,
    ) -> ActionResult<MessageRef> {
        let keyboard = InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback(
                "✅ I'm not a bot",
                captcha::verify_data(participant.id),
            )],
            vec![InlineKeyboardButton::callback(
                "🤖 I'm a bot",
                captcha::bot_data(participant.id),
            )],
        ]);

        let text = format!(
            "🛡 {}, please confirm you are human.\n\nYou have {} minutes to press the button below.",
            mention(participant.id, &participant.display_name),
            timeout_minutes
        );

        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await
            .map_err(|e| ActionError::new("send_challenge", chat_id, e))?;

        Ok(MessageRef::new(chat_id, sent.id.0))
    }

    async fn restrict(&self, chat_id: i64, user_id: u64, can_post: bool) -> ActionResult<()> {
        let permissions = if can_post {
            posting_permissions()
        } else {
            ChatPermissions::empty()
        };

        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id), permissions)
            .await
            .map_err(|e| ActionError::new("restrict", chat_id, e))?;

        debug!("Set can_post={} for {} in {}", can_post, user_id, chat_id);
        Ok(())
    }

    async fn remove(&self, chat_id: i64, user_id: u64) -> ActionResult<()> {
        // Ban then unban = kick
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(|e| ActionError::new("ban", chat_id, e))?;

        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(|e| ActionError::new("unban", chat_id, e))?;

        Ok(())
    }

    async fn deliver(&self, chat_id: i64, text: &str) -> ActionResult<MessageRef> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| ActionError::new("deliver", chat_id, e))?;

        Ok(MessageRef::new(chat_id, sent.id.0))
    }

    async fn delete_message(&self, message: MessageRef) -> ActionResult<()> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await
            .map_err(|e| ActionError::new("delete_message", message.chat_id, e))?;
        Ok(())
    }
}
