//! Test doubles for the engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::cache::CacheRegistry;
use crate::database::error::StoreError;
use crate::database::{
    ActionLogEntry, ChallengeRecord, ConversationPolicy, CooldownRecord, FloodCounter,
    MemoryStore, ModerationStore, StoreResult,
};

use super::actions::{ActionError, ActionResult, ChatActions, MessageRef};
use super::clock::Clock;
use super::events::{AnswerOutcome, ChallengeAnswerEvent, JoinDecision, JoinEvent, Participant};
use super::{EngineSettings, ModerationEngine};

/// A fixed instant offset by `secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendChallenge { chat_id: i64, user_id: u64 },
    Restrict { chat_id: i64, user_id: u64, can_post: bool },
    Remove { chat_id: i64, user_id: u64 },
    Deliver { chat_id: i64, text: String },
    Delete(MessageRef),
}

/// Records every outbound action.
#[derive(Default)]
pub struct RecordingActions {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI32,
    fail_remove: AtomicBool,
}

impl RecordingActions {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn removals(&self, user_id: u64) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Remove { user_id: u, .. } if *u == user_id))
            .count()
    }

    pub fn delivered(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Deliver { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    fn next_message(&self, chat_id: i64) -> MessageRef {
        MessageRef::new(chat_id, 1000 + self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ChatActions for RecordingActions {
    async fn send_challenge(
        &self,
        chat_id: i64,
        participant: &Participant,
        _timeout_minutes: u32,
    ) -> ActionResult<MessageRef> {
        self.calls.lock().push(Call::SendChallenge {
            chat_id,
            user_id: participant.id,
        });
        Ok(self.next_message(chat_id))
    }

    async fn restrict(&self, chat_id: i64, user_id: u64, can_post: bool) -> ActionResult<()> {
        self.calls.lock().push(Call::Restrict {
            chat_id,
            user_id,
            can_post,
        });
        Ok(())
    }

    async fn remove(&self, chat_id: i64, user_id: u64) -> ActionResult<()> {
        self.calls.lock().push(Call::Remove { chat_id, user_id });
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(ActionError::new("remove", chat_id, "not enough rights"));
        }
        Ok(())
    }

    async fn deliver(&self, chat_id: i64, text: &str) -> ActionResult<MessageRef> {
        self.calls.lock().push(Call::Deliver {
            chat_id,
            text: text.to_string(),
        });
        Ok(self.next_message(chat_id))
    }

    async fn delete_message(&self, message: MessageRef) -> ActionResult<()> {
        self.calls.lock().push(Call::Delete(message));
        Ok(())
    }
}

/// A concurrent write that lands right after an attempt increment.
#[derive(Debug, Clone)]
pub enum Interleaved {
    /// The participant answers correctly
    Pass,
    /// The participant re-joins and gets a fresh challenge
    Reissue(ChallengeRecord),
}

/// `MemoryStore` that can be switched off, made to fail a number of
/// warning increments, or have a competing write slipped in.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
    warning_failures: AtomicU32,
    after_increment: Mutex<Option<Interleaved>>,
}

impl FlakyStore {
    pub fn down() -> Self {
        let store = Self::default();
        store.set_down(true);
        store
    }

    pub fn failing_warnings(times: u32) -> Self {
        let store = Self::default();
        store.warning_failures.store(times, Ordering::SeqCst);
        store
    }

    /// Apply `write` once, right after the next attempt increment.
    pub fn interleave_after_increment(&self, write: Interleaved) {
        *self.after_increment.lock() = Some(write);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ActionLogEntry> {
        self.inner.events()
    }

    fn check(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ModerationStore for FlakyStore {
    async fn load_policy(&self, chat_id: i64) -> StoreResult<Option<ConversationPolicy>> {
        self.check()?;
        self.inner.load_policy(chat_id).await
    }

    async fn save_policy(&self, policy: &ConversationPolicy) -> StoreResult<()> {
        self.check()?;
        self.inner.save_policy(policy).await
    }

    async fn log_event(&self, entry: ActionLogEntry) -> StoreResult<()> {
        self.check()?;
        self.inner.log_event(entry).await
    }

    async fn upsert_challenge(&self, record: &ChallengeRecord) -> StoreResult<()> {
        self.check()?;
        self.inner.upsert_challenge(record).await
    }

    async fn attach_challenge_message(
        &self,
        chat_id: i64,
        user_id: u64,
        message_id: i32,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner
            .attach_challenge_message(chat_id, user_id, message_id)
            .await
    }

    async fn get_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.check()?;
        self.inner.get_challenge(chat_id, user_id).await
    }

    async fn mark_challenge_passed(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.check()?;
        self.inner.mark_challenge_passed(chat_id, user_id).await
    }

    async fn increment_challenge_attempts(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.check()?;
        let incremented = self.inner.increment_challenge_attempts(chat_id, user_id).await;

        let competing = self.after_increment.lock().take();
        match competing {
            Some(Interleaved::Pass) => {
                self.inner.mark_challenge_passed(chat_id, user_id).await?;
            }
            Some(Interleaved::Reissue(record)) => self.inner.upsert_challenge(&record).await?,
            None => {}
        }
        incremented
    }

    async fn claim_failed_challenge(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.check()?;
        self.inner.claim_failed_challenge(chat_id, user_id).await
    }

    async fn expired_challenges(&self, now: DateTime<Utc>) -> StoreResult<Vec<ChallengeRecord>> {
        self.check()?;
        self.inner.expired_challenges(now).await
    }

    async fn claim_expired_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.claim_expired_challenge(chat_id, user_id, now).await
    }

    async fn record_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<FloodCounter> {
        self.check()?;
        self.inner.record_flood(chat_id, user_id, now, window).await
    }

    async fn get_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<Option<FloodCounter>> {
        self.check()?;
        self.inner.get_flood(chat_id, user_id, now, window).await
    }

    async fn accept_post(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        self.check()?;
        self.inner.accept_post(chat_id, user_id, now, cooldown).await
    }

    async fn get_cooldown(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<CooldownRecord>> {
        self.check()?;
        self.inner.get_cooldown(chat_id, user_id).await
    }

    async fn purge_stale_cooldowns(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        self.check()?;
        self.inner.purge_stale_cooldowns(before).await
    }

    async fn reset_chat_cooldowns(&self, chat_id: i64) -> StoreResult<u64> {
        self.check()?;
        self.inner.reset_chat_cooldowns(chat_id).await
    }

    async fn add_warning(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> StoreResult<u32> {
        self.check()?;
        let pending_failures = self
            .warning_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending_failures.is_ok() {
            return Err(StoreError::Unavailable("write conflict".into()));
        }
        self.inner.add_warning(chat_id, user_id, now).await
    }

    async fn get_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        self.check()?;
        self.inner.get_warnings(chat_id, user_id).await
    }

    async fn reset_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.check()?;
        self.inner.reset_warnings(chat_id, user_id).await
    }

    async fn reset_chat_warnings(&self, chat_id: i64) -> StoreResult<u64> {
        self.check()?;
        self.inner.reset_chat_warnings(chat_id).await
    }
}

/// An engine wired to in-memory fakes, starting at `at(0)`.
pub struct Harness {
    pub chat_id: i64,
    pub engine: Arc<ModerationEngine>,
    pub store: Arc<FlakyStore>,
    pub actions: Arc<RecordingActions>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(FlakyStore::default());
        let actions = Arc::new(RecordingActions::default());
        let clock = Arc::new(ManualClock::new(at(0)));
        let settings = EngineSettings {
            notice_ttl: Duration::from_secs(3600),
            ..EngineSettings::default()
        };
        let engine = Arc::new(ModerationEngine::with_clock(
            store.clone(),
            actions.clone(),
            &CacheRegistry::new(),
            settings,
            clock.clone(),
        ));

        Self {
            chat_id: -100_123,
            engine,
            store,
            actions,
            clock,
        }
    }

    pub async fn set_policy(&self, change: impl FnOnce(&mut ConversationPolicy)) {
        let mut policy = self.engine.policies().get(self.chat_id).await;
        change(&mut policy);
        self.engine.policies().update(policy).await.unwrap();
    }

    /// Join a participant of unknown account age.
    pub async fn join(&self, user_id: u64) -> JoinDecision {
        let event = JoinEvent {
            chat_id: self.chat_id,
            chat_title: "Test chat".into(),
            participants: vec![Participant::new(user_id, format!("user{}", user_id))],
            service_message: None,
        };
        self.engine.evaluate_join(&event).await[0].1
    }

    pub async fn answer(&self, user_id: u64, correct: bool) -> AnswerOutcome {
        self.engine
            .answer_challenge(&ChallengeAnswerEvent {
                chat_id: self.chat_id,
                responder_id: user_id,
                owner_id: user_id,
                correct,
            })
            .await
    }

    /// Join and answer correctly.
    pub async fn pass_challenge(&self, user_id: u64) {
        assert_eq!(self.join(user_id).await, JoinDecision::Challenged);
        assert_eq!(self.answer(user_id, true).await, AnswerOutcome::Passed);
    }

    pub fn count_logged(&self, kind: &str, detail: &str) -> usize {
        self.store
            .events()
            .iter()
            .filter(|e| e.chat_id == self.chat_id && e.kind.as_str() == kind && e.detail == detail)
            .count()
    }

    pub fn logged(&self, kind: &str, detail: &str) -> bool {
        self.count_logged(kind, detail) > 0
    }
}
