//! Moderation settings plugin.
//!
//! /enable and /disable flip the per-chat master switch, /status shows the
//! resolved policy. The remaining setting commands take one argument each;
//! without it they show the current value and the usage.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters, UserId};
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{ChallengePolicy, ConversationPolicy};
use crate::moderation::changes::{MAX_WARNINGS_RANGE, MIN_ACCOUNT_AGE_RANGE, VALID_DAYS_RANGE};
use crate::moderation::{PolicyChange, Preset, Toggle};
use crate::utils::html_escape;

pub fn parse_switch(arg: &str) -> Option<bool> {
    match arg.trim().to_ascii_lowercase().as_str() {
        "on" | "enable" | "yes" | "true" => Some(true),
        "off" | "disable" | "no" | "false" => Some(false),
        _ => None,
    }
}

/// The policy field a setting command edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Switch(Toggle),
    ChallengePolicy,
    ValidDays,
    MinAccountAge,
    MaxWarnings,
    Preset,
}

impl Setting {
    fn label(self) -> &'static str {
        match self {
            Self::Switch(toggle) => toggle.label(),
            Self::ChallengePolicy => "Challenge policy",
            Self::ValidDays => "Pass validity (days)",
            Self::MinAccountAge => "Min account age (days)",
            Self::MaxWarnings => "Max warnings",
            Self::Preset => "Preset",
        }
    }

    fn usage(self) -> String {
        match self {
            Self::Switch(_) => "on | off".to_string(),
            Self::ChallengePolicy => "persistent | time_based | always".to_string(),
            Self::ValidDays => range_usage(&VALID_DAYS_RANGE),
            Self::MinAccountAge => range_usage(&MIN_ACCOUNT_AGE_RANGE),
            Self::MaxWarnings => range_usage(&MAX_WARNINGS_RANGE),
            Self::Preset => "standard | max | on | off".to_string(),
        }
    }

    pub fn parse(self, arg: &str) -> Option<PolicyChange> {
        let number = || arg.trim().parse::<u32>().ok();
        match self {
            Self::Switch(toggle) => parse_switch(arg).map(|on| PolicyChange::Toggle(toggle, on)),
            Self::ChallengePolicy => ChallengePolicy::parse(arg).map(PolicyChange::ChallengePolicy),
            Self::ValidDays => number().map(PolicyChange::ChallengeValidDays),
            Self::MinAccountAge => number().map(PolicyChange::MinAccountAge),
            Self::MaxWarnings => number().map(PolicyChange::MaxWarnings),
            Self::Preset => Preset::parse(arg).map(PolicyChange::Preset),
        }
    }

    /// Current value as shown to admins. Presets have none.
    fn current(self, policy: &ConversationPolicy) -> Option<String> {
        let value = match self {
            Self::Switch(toggle) => on_off(match toggle {
                Toggle::Challenge => policy.challenge_enabled,
                Toggle::Cooldown => policy.cooldown_enabled,
                Toggle::AntiFlood => policy.anti_flood_enabled,
                Toggle::ProtectContent => policy.protect_content,
                Toggle::DeleteServiceMessages => policy.delete_service_messages,
            })
            .to_string(),
            Self::ChallengePolicy => policy.challenge_policy.as_str().to_string(),
            Self::ValidDays => policy.challenge_valid_days.to_string(),
            Self::MinAccountAge => policy.min_account_age_days.to_string(),
            Self::MaxWarnings => policy.max_warnings.to_string(),
            Self::Preset => return None,
        };
        Some(value)
    }
}

fn range_usage(range: &std::ops::RangeInclusive<u32>) -> String {
    format!("{}-{}", range.start(), range.end())
}

/// Group-only, and the sender needs the right to change group info.
/// Replies with the reason when the check fails.
pub(crate) async fn ensure_can_change_info(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
) -> anyhow::Result<bool> {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));

    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        bot.send_message(chat_id, "❌ This command only works in groups.").await?;
        return Ok(false);
    }

    if !state.permissions.can_change_info(chat_id, user_id).await.unwrap_or(false) {
        bot.send_message(chat_id, "❌ You need the permission to change group info.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(false);
    }

    Ok(true)
}

/// Persist a change. A failed save is reported to the chat.
pub(crate) async fn save_change(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    change: PolicyChange,
) -> anyhow::Result<ConversationPolicy> {
    let chat_id = msg.chat.id;
    let described = format!("{:?}", change);

    match state.engine.change_policy(chat_id.0, change).await {
        Ok(policy) => {
            let by = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));
            info!("Policy of {} changed by {}: {}", chat_id, by, described);
            Ok(policy)
        }
        Err(e) => {
            bot.send_message(chat_id, "❌ Could not save the setting, try again later.")
                .await?;
            Err(e.into())
        }
    }
}

pub async fn enable_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    set_enabled(bot, msg, state, true).await
}

pub async fn disable_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    set_enabled(bot, msg, state, false).await
}

async fn set_enabled(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    enabled: bool,
) -> anyhow::Result<()> {
    if !ensure_can_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    if state.engine.policies().get(chat_id.0).await.enabled == enabled {
        let text = if enabled {
            "ℹ️ Moderation is already enabled."
        } else {
            "ℹ️ Moderation is already disabled."
        };
        bot.send_message(chat_id, text).await?;
        return Ok(());
    }

    save_change(&bot, &msg, &state, PolicyChange::Enabled(enabled)).await?;
    let text = if enabled {
        "✅ Moderation enabled."
    } else {
        "⏸ Moderation disabled."
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Shared body of the single-argument setting commands.
async fn edit_setting(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    setting: Setting,
    args: String,
) -> anyhow::Result<()> {
    if !ensure_can_change_info(&bot, &msg, &state).await? {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let arg = args.trim();

    let Some(change) = setting.parse(arg) else {
        let policy = state.engine.policies().get(chat_id.0).await;
        let mut text = String::new();
        if !arg.is_empty() {
            text.push_str(&format!("❌ Invalid value <code>{}</code>.\n", html_escape(arg)));
        }
        if let Some(current) = setting.current(&policy) {
            text.push_str(&format!("<b>{}:</b> {}\n", setting.label(), current));
        }
        text.push_str(&format!("Usage: <code>{}</code>", setting.usage()));

        bot.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    };

    let policy = save_change(&bot, &msg, &state, change).await?;
    let text = match setting.current(&policy) {
        Some(value) => format!("✅ <b>{}:</b> {}", setting.label(), value),
        None => format!("✅ Preset applied.\n\n{}", render_status(&policy)),
    };
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn captcha_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Switch(Toggle::Challenge), args).await
}

pub async fn cooldown_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Switch(Toggle::Cooldown), args).await
}

pub async fn antiflood_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Switch(Toggle::AntiFlood), args).await
}

pub async fn protectcomments_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Switch(Toggle::ProtectContent), args).await
}

pub async fn cleanservice_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Switch(Toggle::DeleteServiceMessages), args).await
}

pub async fn captchapolicy_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::ChallengePolicy, args).await
}

pub async fn captchadays_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::ValidDays, args).await
}

pub async fn minage_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::MinAccountAge, args).await
}

pub async fn maxwarns_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::MaxWarnings, args).await
}

pub async fn preset_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    edit_setting(bot, msg, state, Setting::Preset, args).await
}

pub async fn status_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let user_id = msg.from.as_ref().map(|u| u.id).unwrap_or(UserId(0));

    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        return Ok(());
    }

    if !state.permissions.is_admin(chat_id, user_id).await.unwrap_or(false) {
        bot.send_message(chat_id, "❌ Only admins can view the moderation status.")
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    let policy = state.engine.policies().get(chat_id.0).await;
    bot.send_message(chat_id, render_status(&policy))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn render_status(policy: &ConversationPolicy) -> String {
    format!(
        "<b>Moderation:</b> {}\n\
         <b>Min account age:</b> {} day(s)\n\
         <b>Anti-flood:</b> {} (max {} warnings)\n\
         <b>Cooldown:</b> {}\n\
         <b>Protect comments:</b> {}\n\
         <b>Challenge:</b> {} ({}, {} min, {} attempts, valid {} days)\n\
         <b>Delete join messages:</b> {}\n\
         <b>Welcome:</b> {}",
        on_off(policy.enabled),
        policy.min_account_age_days,
        on_off(policy.anti_flood_enabled),
        policy.warning_limit(),
        on_off(policy.cooldown_enabled),
        on_off(policy.protect_content),
        on_off(policy.challenge_enabled),
        policy.challenge_policy.as_str(),
        policy.challenge_timeout_minutes,
        policy.attempt_limit(),
        policy.challenge_valid_days,
        on_off(policy.delete_service_messages),
        if policy.welcome_template.trim().is_empty() {
            "<i>none</i>".to_string()
        } else {
            html_escape(&policy.welcome_template)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_status_escapes_template() {
        let mut policy = ConversationPolicy::defaults(-1);
        policy.welcome_template = "Hi <b>{name}</b>".to_string();
        let text = render_status(&policy);
        assert!(text.contains("<b>Moderation:</b> on"));
        assert!(text.contains("persistent, 10 min, 3 attempts"));
        assert!(text.contains("Hi &lt;b&gt;{name}&lt;/b&gt;"));
    }

    #[test]
    fn test_render_status_without_welcome() {
        let mut policy = ConversationPolicy::defaults(-1);
        policy.welcome_template = String::new();
        policy.enabled = false;
        let text = render_status(&policy);
        assert!(text.contains("<b>Moderation:</b> off"));
        assert!(text.contains("<i>none</i>"));
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("ON"), Some(true));
        assert_eq!(parse_switch(" disable "), Some(false));
        assert_eq!(parse_switch(""), None);
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn test_setting_arguments() {
        assert_eq!(
            Setting::Switch(Toggle::Cooldown).parse("on"),
            Some(PolicyChange::Toggle(Toggle::Cooldown, true))
        );
        assert_eq!(
            Setting::ChallengePolicy.parse("always"),
            Some(PolicyChange::ChallengePolicy(ChallengePolicy::Always))
        );
        assert_eq!(Setting::MaxWarnings.parse("5"), Some(PolicyChange::MaxWarnings(5)));
        assert_eq!(Setting::ValidDays.parse("-1"), None);
        assert_eq!(Setting::MinAccountAge.parse(""), None);
        assert_eq!(Setting::Preset.parse("max"), Some(PolicyChange::Preset(Preset::Maximum)));
    }

    #[test]
    fn test_current_values_follow_policy() {
        let mut policy = ConversationPolicy::defaults(-1);
        policy.cooldown_enabled = true;
        policy.challenge_valid_days = 12;

        assert_eq!(Setting::Switch(Toggle::Cooldown).current(&policy).as_deref(), Some("on"));
        assert_eq!(Setting::Switch(Toggle::AntiFlood).current(&policy).as_deref(), Some("on"));
        assert_eq!(Setting::ValidDays.current(&policy).as_deref(), Some("12"));
        assert_eq!(Setting::Preset.current(&policy), None);
        assert_eq!(Setting::MaxWarnings.usage(), "1-10");
    }
}
