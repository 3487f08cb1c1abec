//! Welcome template commands.
//!
//! /setwelcome takes the template after the command or from the replied-to
//! message; `off` clears it, which disables the welcome. /welcome shows the
//! template and a preview rendered for the caller.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters, UserId};

use super::settings::{ensure_can_change_info, save_change};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::moderation::PolicyChange;
use crate::utils::{apply_welcome_fillings, html_escape};

/// Longest accepted template, in characters.
const MAX_TEMPLATE_CHARS: usize = 1024;

#[derive(Debug, PartialEq, Eq)]
enum TemplateInput {
    Set(String),
    Clear,
    Missing,
    TooLong,
}

fn template_input(args: &str, replied: Option<&str>) -> TemplateInput {
    let text = if args.is_empty() {
        replied.map(str::trim).unwrap_or("")
    } else {
        args
    };

    match text {
        "" => TemplateInput::Missing,
        "off" | "none" => TemplateInput::Clear,
        t if t.chars().count() > MAX_TEMPLATE_CHARS => TemplateInput::TooLong,
        t => TemplateInput::Set(t.to_string()),
    }
}

/// Handle /setwelcome.
pub async fn setwelcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if !ensure_can_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let replied = msg.reply_to_message().and_then(|r| r.text().or(r.caption()));
    let change = match template_input(args.trim(), replied) {
        TemplateInput::Set(text) => PolicyChange::WelcomeTemplate(text),
        TemplateInput::Clear => PolicyChange::WelcomeTemplate(String::new()),
        TemplateInput::Missing => {
            bot.send_message(
                chat_id,
                "Usage: <code>/setwelcome text</code> or reply to a message.\n\
                 Fillings: <code>{name}</code> <code>{mention}</code> <code>{chat}</code> \
                 <code>{rules}</code>. Use <code>/setwelcome off</code> to disable.",
            )
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
            return Ok(());
        }
        TemplateInput::TooLong => {
            bot.send_message(
                chat_id,
                format!("❌ The welcome can be at most {} characters.", MAX_TEMPLATE_CHARS),
            )
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
            return Ok(());
        }
    };

    let policy = save_change(&bot, &msg, &state, change).await?;
    let text = if policy.welcome_template.is_empty() {
        "✅ Welcome disabled."
    } else {
        "✅ Welcome message saved."
    };
    bot.send_message(chat_id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Handle /resetwelcome.
pub async fn resetwelcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    if !ensure_can_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    save_change(&bot, &msg, &state, PolicyChange::ResetWelcome).await?;
    bot.send_message(msg.chat.id, "✅ Welcome message reset to the default.")
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Handle /welcome.
pub async fn welcome_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        return Ok(());
    }

    if !state.permissions.is_admin(chat_id, user.id).await.unwrap_or(false) {
        bot.send_message(chat_id, "❌ Only admins can view the welcome message.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    let policy = state.engine.policies().get(chat_id.0).await;
    let text = render_welcome(
        &policy.welcome_template,
        user.id,
        &user.full_name(),
        msg.chat.title().unwrap_or("the group"),
    );
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

fn render_welcome(template: &str, user_id: UserId, name: &str, chat_title: &str) -> String {
    if template.trim().is_empty() {
        return "ℹ️ Welcome is disabled.".to_string();
    }
    format!(
        "<b>Template:</b>\n<code>{}</code>\n\n<b>Preview:</b>\n{}",
        html_escape(template),
        apply_welcome_fillings(template, user_id.0, name, chat_title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_from_args_or_reply() {
        assert_eq!(
            template_input("Hi {name}", Some("ignored")),
            TemplateInput::Set("Hi {name}".into())
        );
        assert_eq!(
            template_input("", Some("  Hello {mention}  ")),
            TemplateInput::Set("Hello {mention}".into())
        );
        assert_eq!(template_input("", None), TemplateInput::Missing);
        assert_eq!(template_input("off", None), TemplateInput::Clear);
        assert_eq!(
            template_input(&"x".repeat(MAX_TEMPLATE_CHARS + 1), None),
            TemplateInput::TooLong
        );
    }

    #[test]
    fn test_render_welcome_preview() {
        let text = render_welcome("Hi {name} in {chat}", UserId(5), "Ann", "Cats");
        assert!(text.contains("<code>Hi {name} in {chat}</code>"));
        assert!(text.ends_with("Hi Ann in Cats"));
        assert_eq!(render_welcome(" ", UserId(5), "Ann", "Cats"), "ℹ️ Welcome is disabled.");
    }
}
