//! Warning command handlers.
//!
//! Inspect and reset the flood warning ledger of the replied-to user.
//! /warns also shows the user's flood window, last post and challenge state.
//! /resetallwarns and /resetcooldowns clear the whole chat.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters, User, UserId};
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{ChallengeRecord, CooldownRecord};
use crate::utils::mention;

/// Target of a warning command: the author of the replied-to message.
fn reply_target(msg: &Message) -> Option<&User> {
    msg.reply_to_message().and_then(|reply| reply.from.as_ref())
}

/// Handle /warns.
pub async fn warns_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let admin_id = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));

    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        return Ok(());
    }

    if !state.permissions.is_admin(chat_id, admin_id).await.unwrap_or(false) {
        bot.send_message(chat_id, "❌ Only admins can view warnings.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    let Some(target) = reply_target(&msg) else {
        bot.send_message(chat_id, "❌ Reply to a message of the user.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    };

    let engine = &state.engine;
    let user_id = target.id.0;
    let report = MemberReport {
        warnings: engine.warnings(chat_id.0, user_id).await?,
        limit: engine.policies().get(chat_id.0).await.warning_limit(),
        recent: engine.flood_counter(chat_id.0, user_id).await?.map_or(0, |c| c.count),
        cooldown: engine.cooldown(chat_id.0, user_id).await?,
        challenge: engine.challenge(chat_id.0, user_id).await?,
    };

    let text = report.render(&mention(user_id, &target.full_name()));
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle /resetwarns.
pub async fn resetwarns_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    if !ensure_can_restrict(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let admin_id = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));
    let Some(target) = reply_target(&msg) else {
        bot.send_message(chat_id, "❌ Reply to a message of the user.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    };

    let removed = state.engine.reset_warnings(chat_id.0, target.id.0).await?;
    let name = mention(target.id.0, &target.full_name());
    let text = if removed {
        info!("Warnings of {} in {} reset by {}", target.id, chat_id, admin_id);
        format!("✅ Warnings of {} have been reset.", name)
    } else {
        format!("ℹ️ {} has no warnings.", name)
    };

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Group-only, and the sender needs the right to restrict members.
async fn ensure_can_restrict(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
) -> anyhow::Result<bool> {
    let chat_id = msg.chat.id;
    let admin_id = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));

    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        return Ok(false);
    }

    if !state.permissions.can_restrict_members(chat_id, admin_id).await.unwrap_or(false) {
        bot.send_message(chat_id, "❌ You need the permission to restrict members.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(false);
    }

    Ok(true)
}

/// Handle /resetallwarns.
pub async fn resetallwarns_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    if !ensure_can_restrict(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let cleared = state.engine.reset_all_warnings(chat_id.0).await?;
    info!("{} warning ledger entries cleared in {}", cleared, chat_id);
    bot.send_message(chat_id, format!("✅ Warnings cleared for {} member(s).", cleared))
        .await?;
    Ok(())
}

/// Handle /resetcooldowns.
pub async fn resetcooldowns_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    if !ensure_can_restrict(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let cleared = state.engine.reset_all_cooldowns(chat_id.0).await?;
    info!("{} cooldown records cleared in {}", cleared, chat_id);
    bot.send_message(chat_id, format!("✅ Post cooldown reset for {} member(s).", cleared))
        .await?;
    Ok(())
}

/// Moderation state of one member, as shown by /warns.
struct MemberReport {
    warnings: u32,
    limit: u32,
    recent: u32,
    cooldown: Option<CooldownRecord>,
    challenge: Option<ChallengeRecord>,
}

impl MemberReport {
    fn render(&self, name: &str) -> String {
        let last_post = self.cooldown.as_ref().map_or_else(
            || "never".to_string(),
            |c| c.last_post_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        let challenge = match &self.challenge {
            None => "none".to_string(),
            Some(r) if r.is_pending() => format!(
                "pending, {} attempt(s) left",
                r.remaining_attempts()
            ),
            Some(r) => format!("passed on {}", r.created_at.format("%Y-%m-%d")),
        };

        format!(
            "⚠️ {} has <b>{}/{}</b> flood warnings.\n\
             Messages in the current flood window: {}\n\
             Last accepted post: {}\n\
             Challenge: {}",
            name, self.warnings, self.limit, self.recent, last_post, challenge
        )
    }
}
