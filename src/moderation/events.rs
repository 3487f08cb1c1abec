//! Engine inputs and outcomes.

use chrono::{DateTime, Utc};

use super::actions::MessageRef;

/// A chat member as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: u64,
    pub display_name: String,
    pub is_bot: bool,
    /// Unknown on platforms that do not expose account creation time
    pub account_created_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_bot: false,
            account_created_at: None,
        }
    }

    /// Account age in whole days, if known.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.account_created_at
            .map(|created| (now - created).num_days())
    }

    /// The account age, when known and below `days`.
    pub fn age_if_younger_than(&self, days: u32, now: DateTime<Utc>) -> Option<i64> {
        self.account_age_days(now)
            .filter(|age| *age < i64::from(days))
    }
}

/// One or more participants joined.
#[derive(Debug, Clone)]
pub struct JoinEvent {
    pub chat_id: i64,
    pub chat_title: String,
    pub participants: Vec<Participant>,
    /// The platform's "X joined" service message
    pub service_message: Option<MessageRef>,
}

/// A participant posted something.
#[derive(Debug, Clone)]
pub struct ContentEvent {
    pub chat_id: i64,
    pub sender: Participant,
    pub message: MessageRef,
    pub text: Option<String>,
    /// A comment in a discussion thread or topic
    pub is_thread_reply: bool,
}

/// A participant pressed a challenge button.
#[derive(Debug, Clone)]
pub struct ChallengeAnswerEvent {
    pub chat_id: i64,
    pub responder_id: u64,
    /// The participant the challenge was issued to
    pub owner_id: u64,
    pub correct: bool,
}

#[derive(Debug, Clone)]
pub enum ModerationEvent {
    Join(JoinEvent),
    Content(ContentEvent),
    ChallengeAnswer(ChallengeAnswerEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    Join(Vec<(u64, JoinDecision)>),
    Content(ContentVerdict),
    ChallengeAnswer(AnswerOutcome),
}

/// What happened to one joining participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    /// Engine disabled or participant is a bot
    Skipped,
    /// Account too young
    Removed,
    Challenged,
    /// A challenge was due but could not be recorded
    ChallengeUnavailable,
    Welcomed,
    /// Nothing to do and no welcome could be delivered
    Admitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentVerdict {
    Allowed,
    ChallengePending,
    Cooldown { remaining_secs: u64 },
    YoungAccount { age_days: i64 },
    Flood { warnings: u32, removed: bool },
    Spam,
}

impl ContentVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Passed,
    Retry { remaining: u32 },
    Removed,
    /// Someone other than the challenged participant answered
    NotYours,
    /// No pending challenge
    NoChallenge,
    /// Storage unavailable, nothing changed
    RetryLater,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_age_in_whole_days() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut p = Participant::new(1, "Ann");
        assert_eq!(p.account_age_days(now), None);
        assert_eq!(p.age_if_younger_than(1, now), None);

        p.account_created_at = Some(now - chrono::Duration::hours(47));
        assert_eq!(p.account_age_days(now), Some(1));
        assert_eq!(p.age_if_younger_than(2, now), Some(1));
        assert_eq!(p.age_if_younger_than(1, now), None);
    }
}
