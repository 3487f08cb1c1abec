//! Bot module - Telegram glue around the moderation engine.

pub mod actions;
pub mod dispatcher;
mod runtime;
pub mod webhook;

pub use actions::TelegramActions;
pub use dispatcher::{AppState, build_dispatcher};
pub use runtime::run;
