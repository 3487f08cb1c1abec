//! Permission system for checking user roles.
//!
//! Admin lookups go through the Telegram API once and are then cached, so
//! per-message checks stay cheap.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let perms = Permissions::with_owners(bot.clone(), &cache, owner_ids);
//!
//! if perms.can_change_info(chat_id, user_id).await? {
//!     // ...
//! }
//! ```

mod checker;

pub use checker::Permissions;
