//! Database model exports.

pub mod action_log;
pub mod challenge;
pub mod counters;
pub mod policy;

pub use action_log::{ActionKind, ActionLogEntry};
pub use challenge::{ChallengeRecord, ChallengeState};
pub use counters::{CooldownRecord, FloodCounter, WarningLedgerEntry};
pub use policy::{ChallengePolicy, ConversationPolicy, DEFAULT_WELCOME_TEMPLATE};
