//! Flood window and cooldown repositories.
//!
//! Both counters are updated with a single aggregation-pipeline upsert that
//! reads the stored timestamp and decides the new value server-side.

use chrono::{DateTime, Utc};
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use crate::database::Database;
use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{CooldownRecord, FloodCounter};

pub const FLOOD_COLLECTION: &str = "flood_counters";
pub const COOLDOWN_COLLECTION: &str = "cooldowns";

fn key(chat_id: i64, user_id: u64) -> Document {
    doc! { "chat_id": chat_id, "user_id": user_id as i64 }
}

/// Server-side sliding window: keep counting while the previous message is
/// within `cutoff`, otherwise restart at 1.
fn flood_pipeline(now: DateTime<Utc>, cutoff: DateTime<Utc>) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "count": {
                "$cond": [
                    { "$gte": [{ "$ifNull": ["$window_start", i64::MIN] }, cutoff.timestamp_millis()] },
                    { "$add": ["$count", 1] },
                    1
                ]
            },
            "window_start": now.timestamp_millis(),
        }
    }]
}

/// Move `last_post_at` to `now` only when the previous post is not newer
/// than `cutoff`.
fn cooldown_pipeline(now: DateTime<Utc>, cutoff: DateTime<Utc>) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "last_post_at": {
                "$cond": [
                    { "$gt": [{ "$ifNull": ["$last_post_at", i64::MIN] }, cutoff.timestamp_millis()] },
                    "$last_post_at",
                    now.timestamp_millis()
                ]
            }
        }
    }]
}

fn upsert_returning(document: ReturnDocument) -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(document)
        .build()
}

/// Sliding flood windows.
pub struct FloodRepository {
    collection: Collection<FloodCounter>,
}

impl FloodRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(FLOOD_COLLECTION),
        }
    }

    /// Count one message. A window whose last message is older than `cutoff`
    /// restarts at 1.
    pub async fn record(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<FloodCounter> {
        self.collection
            .find_one_and_update(key(chat_id, user_id), flood_pipeline(now, cutoff))
            .with_options(upsert_returning(ReturnDocument::After))
            .await?
            .ok_or_else(|| StoreError::Unavailable("flood upsert returned no document".into()))
    }

    /// The live window. A lapsed window is deleted and reported as absent.
    pub async fn get(
        &self,
        chat_id: i64,
        user_id: u64,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Option<FloodCounter>> {
        let mut stale = key(chat_id, user_id);
        stale.insert("window_start", doc! { "$lt": cutoff.timestamp_millis() });
        self.collection.delete_one(stale).await?;

        Ok(self.collection.find_one(key(chat_id, user_id)).await?)
    }
}

/// Per-user post cooldowns.
pub struct CooldownRepository {
    collection: Collection<CooldownRecord>,
}

impl CooldownRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COOLDOWN_COLLECTION),
        }
    }

    /// Advance `last_post_at` to `now` unless it is newer than `cutoff`.
    /// Returns the record as it was before the update.
    pub async fn accept(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Option<CooldownRecord>> {
        Ok(self
            .collection
            .find_one_and_update(key(chat_id, user_id), cooldown_pipeline(now, cutoff))
            .with_options(upsert_returning(ReturnDocument::Before))
            .await?)
    }

    pub async fn get(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CooldownRecord>> {
        Ok(self.collection.find_one(key(chat_id, user_id)).await?)
    }

    pub async fn purge_before(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! { "last_post_at": { "$lt": before.timestamp_millis() } };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    pub async fn reset_chat(&self, chat_id: i64) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "chat_id": chat_id })
            .await?;
        Ok(result.deleted_count)
    }
}
