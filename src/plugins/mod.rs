//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`

pub mod settings;
pub mod start;
pub mod warn;
pub mod welcome;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show help")]
    Help,

    // Moderation switch
    #[command(description = "Enable moderation in this group")]
    Enable,

    #[command(description = "Disable moderation in this group")]
    Disable,

    #[command(description = "Show the moderation policy")]
    Status,

    #[command(description = "Apply a preset: standard, max, on, off")]
    Preset(String),

    // Join checks
    #[command(description = "Turn the join challenge on or off")]
    Captcha(String),

    #[command(description = "Challenge policy: persistent, time_based, always")]
    Captchapolicy(String),

    #[command(description = "Days a passed challenge stays valid (time_based)")]
    Captchadays(String),

    #[command(description = "Minimum account age in days, 0 to allow all")]
    Minage(String),

    #[command(description = "Delete join service messages: on or off")]
    Cleanservice(String),

    // Content checks
    #[command(description = "Turn flood control on or off")]
    Antiflood(String),

    #[command(description = "Flood warnings before removal")]
    Maxwarns(String),

    #[command(description = "Turn the post cooldown on or off")]
    Cooldown(String),

    #[command(description = "Moderate discussion comments: on or off")]
    Protectcomments(String),

    #[command(description = "Clear the post cooldown of every member")]
    Resetcooldowns,

    // Welcome
    #[command(description = "Show the welcome message")]
    Welcome,

    #[command(description = "Set the welcome message")]
    Setwelcome(String),

    #[command(description = "Reset the welcome message to the default")]
    Resetwelcome,

    // Warnings
    #[command(description = "Show flood warnings of a user (reply)")]
    Warns,

    #[command(description = "Reset flood warnings of a user (reply)")]
    Resetwarns,

    #[command(description = "Reset flood warnings of every member")]
    Resetallwarns,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start::start_handler))
        .branch(case![Command::Help].endpoint(start::help_handler))
        // Moderation switch
        .branch(case![Command::Enable].endpoint(settings::enable_command))
        .branch(case![Command::Disable].endpoint(settings::disable_command))
        .branch(case![Command::Status].endpoint(settings::status_command))
        .branch(case![Command::Preset(args)].endpoint(settings::preset_command))
        // Join checks
        .branch(case![Command::Captcha(args)].endpoint(settings::captcha_command))
        .branch(case![Command::Captchapolicy(args)].endpoint(settings::captchapolicy_command))
        .branch(case![Command::Captchadays(args)].endpoint(settings::captchadays_command))
        .branch(case![Command::Minage(args)].endpoint(settings::minage_command))
        .branch(case![Command::Cleanservice(args)].endpoint(settings::cleanservice_command))
        // Content checks
        .branch(case![Command::Antiflood(args)].endpoint(settings::antiflood_command))
        .branch(case![Command::Maxwarns(args)].endpoint(settings::maxwarns_command))
        .branch(case![Command::Cooldown(args)].endpoint(settings::cooldown_command))
        .branch(case![Command::Protectcomments(args)].endpoint(settings::protectcomments_command))
        .branch(case![Command::Resetcooldowns].endpoint(warn::resetcooldowns_command))
        // Welcome
        .branch(case![Command::Welcome].endpoint(welcome::welcome_command))
        .branch(case![Command::Setwelcome(args)].endpoint(welcome::setwelcome_command))
        .branch(case![Command::Resetwelcome].endpoint(welcome::resetwelcome_command))
        // Warnings
        .branch(case![Command::Warns].endpoint(warn::warns_command))
        .branch(case![Command::Resetwarns].endpoint(warn::resetwarns_command))
        .branch(case![Command::Resetallwarns].endpoint(warn::resetallwarns_command))
}
