//! New member events.
//!
//! Joins arrive as "new chat members" service messages, which carry the
//! batch of joined users and can be deleted afterwards.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{debug, info};

use crate::bot::dispatcher::AppState;
use crate::moderation::{
    JoinDecision, JoinEvent, MessageRef, ModerationEvent, ModerationOutcome, Participant,
};

pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| {
        (msg.chat.is_group() || msg.chat.is_supergroup())
            && msg.new_chat_members().is_some_and(|m| !m.is_empty())
    })
    .endpoint(new_members_handler)
}

/// The Bot API does not expose account creation time.
pub fn participant_from_user(user: &User) -> Participant {
    Participant {
        id: user.id.0,
        display_name: user.full_name(),
        is_bot: user.is_bot,
        account_created_at: None,
    }
}

async fn new_members_handler(msg: Message, state: AppState) -> anyhow::Result<()> {
    let members = msg.new_chat_members().unwrap_or_default();
    debug!("{} new member(s) in chat {}", members.len(), msg.chat.id);

    let chat_id = msg.chat.id.0;
    let event = ModerationEvent::Join(JoinEvent {
        chat_id,
        chat_title: msg.chat.title().unwrap_or("the group").to_string(),
        participants: members.iter().map(participant_from_user).collect(),
        service_message: Some(MessageRef::new(chat_id, msg.id.0)),
    });

    let ModerationOutcome::Join(decisions) = state.engine.handle(event).await else {
        return Ok(());
    };
    for (user_id, decision) in decisions {
        match decision {
            JoinDecision::Skipped => debug!("Join of {} in {} skipped", user_id, chat_id),
            other => info!("Join of {} in {}: {:?}", user_id, chat_id, other),
        }
    }

    Ok(())
}
