//! Group message events.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::bot::dispatcher::AppState;
use crate::moderation::{ContentEvent, MessageRef, ModerationEvent, ModerationOutcome};

use super::members::participant_from_user;

pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(is_group_content).endpoint(content_handler)
}

/// Group message with a human-visible sender that is not a command.
fn is_group_content(msg: Message) -> bool {
    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        return false;
    }

    if msg.text().is_some_and(|t| t.starts_with('/')) {
        return false;
    }

    msg.from.is_some() && msg.new_chat_members().is_none()
}

/// A comment in a discussion thread or a forum topic.
fn is_thread_reply(msg: &Message) -> bool {
    msg.thread_id.is_some() || msg.is_topic_message
}

async fn content_handler(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    // Chat admins and bot owners bypass moderation
    match state.permissions.is_admin(msg.chat.id, user.id).await {
        Ok(true) => {
            debug!("User {} is admin, bypassing moderation", user.id);
            return Ok(());
        }
        Ok(false) => {}
        Err(e) => error!("Admin lookup failed for {} in {}: {}", user.id, msg.chat.id, e),
    }

    let event = ModerationEvent::Content(ContentEvent {
        chat_id: msg.chat.id.0,
        sender: participant_from_user(user),
        message: MessageRef::new(msg.chat.id.0, msg.id.0),
        text: msg.text().or(msg.caption()).map(str::to_string),
        is_thread_reply: is_thread_reply(&msg),
    });

    if let ModerationOutcome::Content(verdict) = state.engine.handle(event).await
        && !verdict.is_allowed()
    {
        debug!("Message {} from {} in {}: {:?}", msg.id, user.id, msg.chat.id, verdict);
    }
    Ok(())
}
