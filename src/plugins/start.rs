//! /start and /help command plugin.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use super::Command;
use crate::bot::dispatcher::{AppState, ThrottledBot};

const START_TEXT: &str = "<b>Hello!</b> 👋

I am <b>Warden</b>, a group moderation bot.

<b>Features:</b>
• Join verification with a button challenge
• Removal of freshly created accounts
• Flood control with warnings
• Optional post cooldown
• Spam keyword filter
• Custom welcome message and setting presets

Add me to a group as an admin with the <i>ban users</i> and <i>delete messages</i> rights. Use /help to see the commands.";

/// Handle the /start command.
pub async fn start_handler(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, START_TEXT)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle the /help command.
pub async fn help_handler(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let settings = state.engine.settings();
    let text = format!(
        "{}\n\nFlood limit: {} messages per {}s. Cooldown: {}s.",
        Command::descriptions(),
        settings.flood_limit,
        settings.flood_window.as_secs(),
        settings.cooldown.as_secs(),
    );

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
