//! Repository module - one repository per MongoDB collection.

mod action_log_repository;
mod challenge_repository;
mod counter_repository;
mod policy_repository;
mod warning_repository;

pub use action_log_repository::ActionLogRepository;
pub use challenge_repository::ChallengeRepository;
pub use counter_repository::{CooldownRepository, FloodRepository};
pub use policy_repository::PolicyRepository;
pub use warning_repository::WarningRepository;

/// Collections holding one document per (chat_id, user_id).
pub const PER_USER_COLLECTIONS: [&str; 4] = [
    challenge_repository::COLLECTION,
    counter_repository::FLOOD_COLLECTION,
    counter_repository::COOLDOWN_COLLECTION,
    warning_repository::COLLECTION,
];

pub const POLICY_COLLECTION: &str = policy_repository::COLLECTION;
pub const ACTION_LOG_COLLECTION: &str = action_log_repository::COLLECTION;
