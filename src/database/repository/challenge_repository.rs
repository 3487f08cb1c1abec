//! Join challenge repository.
//!
//! State transitions are conditional single-document updates filtered on
//! `state: "pending"`, so concurrent answers and the expiry sweeper cannot
//! both act on the same challenge.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tracing::debug;

use crate::database::Database;
use crate::database::error::StoreResult;
use crate::database::models::{ChallengeRecord, ChallengeState};

pub const COLLECTION: &str = "challenges";

pub struct ChallengeRepository {
    collection: Collection<ChallengeRecord>,
}

fn key(chat_id: i64, user_id: u64) -> Document {
    doc! { "chat_id": chat_id, "user_id": user_id as i64 }
}

fn pending_key(chat_id: i64, user_id: u64) -> Document {
    let mut filter = key(chat_id, user_id);
    filter.insert("state", ChallengeState::Pending.as_str());
    filter
}

/// Pending with every attempt used up.
fn failed_filter(chat_id: i64, user_id: u64) -> Document {
    let mut filter = pending_key(chat_id, user_id);
    filter.insert("$expr", doc! { "$gte": ["$attempts", "$max_attempts"] });
    filter
}

/// Pending and past its deadline.
fn expired_filter(chat_id: i64, user_id: u64, now: DateTime<Utc>) -> Document {
    let mut filter = pending_key(chat_id, user_id);
    filter.insert("expires_at", doc! { "$lt": now.timestamp_millis() });
    filter
}

impl ChallengeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }

    /// Insert or overwrite (upsert).
    pub async fn save(&self, record: &ChallengeRecord) -> StoreResult<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(key(record.chat_id, record.user_id), record)
            .with_options(options)
            .await?;

        debug!(
            "Saved {} challenge for {} in {}",
            record.state.as_str(),
            record.user_id,
            record.chat_id
        );
        Ok(())
    }

    pub async fn set_message(&self, chat_id: i64, user_id: u64, message_id: i32) -> StoreResult<()> {
        let update = doc! { "$set": { "message_id": message_id } };
        self.collection
            .update_one(pending_key(chat_id, user_id), update)
            .await?;
        Ok(())
    }

    pub async fn get(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<ChallengeRecord>> {
        Ok(self.collection.find_one(key(chat_id, user_id)).await?)
    }

    pub async fn mark_passed(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        let update = doc! { "$set": { "state": ChallengeState::Passed.as_str() } };
        self.update_pending(chat_id, user_id, update).await
    }

    pub async fn increment_attempts(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        let update = doc! { "$inc": { "attempts": 1 } };
        self.update_pending(chat_id, user_id, update).await
    }

    async fn update_pending(
        &self,
        chat_id: i64,
        user_id: u64,
        update: Document,
    ) -> StoreResult<Option<ChallengeRecord>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(pending_key(chat_id, user_id), update)
            .with_options(options)
            .await?)
    }

    /// Conditional delete of a pending challenge with no attempts left.
    pub async fn claim_failed(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(failed_filter(chat_id, user_id))
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<ChallengeRecord>> {
        let filter = doc! {
            "state": ChallengeState::Pending.as_str(),
            "expires_at": { "$lt": now.timestamp_millis() },
        };
        let cursor = self.collection.find(filter).await?;
        let records: Vec<ChallengeRecord> = cursor.try_collect().await?;
        Ok(records)
    }

    /// Conditional delete of a pending, expired challenge.
    pub async fn claim_expired(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(expired_filter(chat_id, user_id, now))
            .await?;
        Ok(result.deleted_count > 0)
    }
}
