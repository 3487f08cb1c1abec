//! Event handler system.
//!
//! Adapts Telegram updates into moderation engine events.

pub mod captcha;
pub mod members;
pub mod messages;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

/// Build the message event handler: joins first, then ordinary content.
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(members::handler())
        .branch(messages::handler())
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    captcha::handler()
}
