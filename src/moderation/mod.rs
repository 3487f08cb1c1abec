//! Moderation decision engine.
//!
//! Turns join and content events plus per-chat policy and per-participant
//! state into actions: allow, delete and warn, challenge, restrict or remove.
//!
//! ## Architecture
//!
//! - `PolicyResolver` - typed, defaulted per-chat settings
//! - `Verifier` - challenge state machine and its three policies
//! - `AbuseCounters` - flood window and post cooldown
//! - `WarningLedger` - violation counts, removal at the threshold
//! - `ExpirySweeper` - periodic timeout of unanswered challenges
//!
//! The engine owns no state of its own: everything lives behind
//! `ModerationStore`, and all outbound effects go through `ChatActions`.

pub mod actions;
pub mod changes;
pub mod clock;
pub mod counters;
pub mod events;
mod gate;
pub mod journal;
pub mod notice;
mod pipeline;
pub mod policy;
pub mod spam;
pub mod sweeper;
pub mod verification;
pub mod warnings;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheRegistry;
use crate::database::{
    ChallengeRecord, ConversationPolicy, CooldownRecord, FloodCounter, ModerationStore,
    StoreResult,
};

pub use actions::{ActionError, ActionResult, ChatActions, MessageRef};
pub use changes::{PolicyChange, Preset, Toggle};
pub use clock::{Clock, SystemClock};
pub use counters::AbuseCounters;
pub use events::{
    AnswerOutcome, ChallengeAnswerEvent, ContentEvent, JoinDecision, JoinEvent, ModerationEvent,
    ModerationOutcome, Participant,
};
pub use journal::ActionJournal;
pub use notice::Notifier;
pub use policy::PolicyResolver;
pub use sweeper::ExpirySweeper;
pub use verification::Verifier;
pub use warnings::WarningLedger;

/// Engine-wide tunables that are not part of the per-chat policy.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub flood_window: Duration,
    /// Messages allowed per window; one more is a flood
    pub flood_limit: u32,
    pub cooldown: Duration,
    /// How long rejection notices stay visible
    pub notice_ttl: Duration,
    pub sweep_interval: Duration,
    pub sweep_first_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            flood_window: Duration::from_secs(10),
            flood_limit: 5,
            cooldown: Duration::from_secs(30),
            notice_ttl: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(60),
            sweep_first_delay: Duration::from_secs(10),
        }
    }
}

pub struct ModerationEngine {
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    store: Arc<dyn ModerationStore>,
    actions: Arc<dyn ChatActions>,
    policies: PolicyResolver,
    verifier: Verifier,
    counters: AbuseCounters,
    warnings: WarningLedger,
    journal: Arc<ActionJournal>,
    notifier: Arc<Notifier>,
}

impl ModerationEngine {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        actions: Arc<dyn ChatActions>,
        cache: &CacheRegistry,
        settings: EngineSettings,
    ) -> Self {
        Self::with_clock(store, actions, cache, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn ModerationStore>,
        actions: Arc<dyn ChatActions>,
        cache: &CacheRegistry,
        settings: EngineSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let journal = Arc::new(ActionJournal::new(store.clone(), clock.clone()));
        let notifier = Arc::new(Notifier::new(actions.clone(), settings.notice_ttl));

        Self {
            policies: PolicyResolver::new(store.clone(), cache),
            verifier: Verifier::new(
                store.clone(),
                actions.clone(),
                journal.clone(),
                notifier.clone(),
            ),
            counters: AbuseCounters::new(store.clone(), settings.flood_window, settings.flood_limit),
            warnings: WarningLedger::new(store.clone()),
            settings,
            clock,
            store,
            actions,
            journal,
            notifier,
        }
    }

    /// Dispatch one event to its handler.
    pub async fn handle(&self, event: ModerationEvent) -> ModerationOutcome {
        match event {
            ModerationEvent::Join(join) => ModerationOutcome::Join(self.evaluate_join(&join).await),
            ModerationEvent::Content(content) => {
                ModerationOutcome::Content(self.evaluate_content(&content).await)
            }
            ModerationEvent::ChallengeAnswer(answer) => {
                ModerationOutcome::ChallengeAnswer(self.answer_challenge(&answer).await)
            }
        }
    }

    pub async fn answer_challenge(&self, event: &ChallengeAnswerEvent) -> AnswerOutcome {
        self.verifier.answer(event).await
    }

    pub fn policies(&self) -> &PolicyResolver {
        &self.policies
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        self.warnings.count(chat_id, user_id).await
    }

    pub async fn reset_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.warnings.reset(chat_id, user_id).await
    }

    /// Apply one admin edit to the chat's policy and persist it.
    pub async fn change_policy(
        &self,
        chat_id: i64,
        change: PolicyChange,
    ) -> StoreResult<ConversationPolicy> {
        let mut policy = self.policies.get(chat_id).await;
        change.apply(&mut policy);
        self.policies.update(policy.clone()).await?;
        Ok(policy)
    }

    /// Clear the warning ledger of every member; returns the entries dropped.
    pub async fn reset_all_warnings(&self, chat_id: i64) -> StoreResult<u64> {
        self.store.reset_chat_warnings(chat_id).await
    }

    /// Forget the last accepted post of every member.
    pub async fn reset_all_cooldowns(&self, chat_id: i64) -> StoreResult<u64> {
        self.store.reset_chat_cooldowns(chat_id).await
    }

    pub async fn flood_counter(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<FloodCounter>> {
        self.store
            .get_flood(chat_id, user_id, self.clock.now(), self.settings.flood_window)
            .await
    }

    pub async fn cooldown(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CooldownRecord>> {
        self.store.get_cooldown(chat_id, user_id).await
    }

    pub async fn challenge(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<ChallengeRecord>> {
        self.store.get_challenge(chat_id, user_id).await
    }
}
