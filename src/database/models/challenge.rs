//! Join verification records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stored state of a challenge. Removal is terminal and deletes the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    Pending,
    Passed,
}

impl ChallengeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
        }
    }
}

/// One challenge per (chat, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeRecord {
    pub chat_id: i64,
    pub user_id: u64,
    pub state: ChallengeState,
    #[serde(default)]
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    /// The delivered challenge prompt, once known
    #[serde(default)]
    pub message_id: Option<i32>,
}

impl ChallengeRecord {
    /// A fresh pending challenge issued at `now`.
    pub fn pending(
        chat_id: i64,
        user_id: u64,
        max_attempts: u32,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        Self {
            chat_id,
            user_id,
            state: ChallengeState::Pending,
            attempts: 0,
            max_attempts,
            created_at: now,
            expires_at: now + timeout,
            message_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == ChallengeState::Pending
    }

    pub fn is_passed(&self) -> bool {
        self.state == ChallengeState::Passed
    }

    /// Pending and past its deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now > self.expires_at
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Passed, and created no earlier than `valid_days` before `now`.
    /// A validity reaching past the earliest representable time never lapses.
    pub fn passed_within(&self, now: DateTime<Utc>, valid_days: u32) -> bool {
        let cutoff = Duration::try_days(i64::from(valid_days))
            .and_then(|validity| now.checked_sub_signed(validity));
        self.is_passed() && cutoff.is_none_or(|cutoff| self.created_at >= cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let record = ChallengeRecord::pending(1, 2, 3, at(1_000), Duration::minutes(10));
        assert!(!record.is_expired(at(1_600)));
        assert!(record.is_expired(at(1_601)));
    }

    #[test]
    fn test_passed_records_never_expire() {
        let mut record = ChallengeRecord::pending(1, 2, 3, at(0), Duration::minutes(10));
        record.state = ChallengeState::Passed;
        assert!(!record.is_expired(at(1_000_000)));
    }

    #[test]
    fn test_remaining_attempts_saturates() {
        let mut record = ChallengeRecord::pending(1, 2, 3, at(0), Duration::minutes(10));
        record.attempts = 5;
        assert!(record.attempts_exhausted());
        assert_eq!(record.remaining_attempts(), 0);
    }

    #[test]
    fn test_passed_within_boundaries() {
        let mut record = ChallengeRecord::pending(1, 2, 3, at(0), Duration::minutes(10));
        assert!(!record.passed_within(at(0), 30));

        record.state = ChallengeState::Passed;
        let day = 86_400;
        assert!(record.passed_within(at(30 * day), 30));
        assert!(!record.passed_within(at(31 * day), 30));
    }

    #[test]
    fn test_huge_validity_never_lapses() {
        let mut record = ChallengeRecord::pending(1, 2, 3, at(0), Duration::minutes(10));
        record.state = ChallengeState::Passed;
        assert!(record.passed_within(at(1_000_000_000), u32::MAX));
    }

    #[test]
    fn test_stored_timestamps_are_millis() {
        let record = ChallengeRecord::pending(1, 2, 3, at(60), Duration::minutes(1));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["created_at"], 60_000);
        assert_eq!(json["expires_at"], 120_000);
        assert_eq!(json["state"], "pending");
    }
}
