//! Warning ledger repository.

use chrono::{DateTime, Utc};
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tracing::debug;

use crate::database::Database;
use crate::database::error::{StoreError, StoreResult};
use crate::database::models::WarningLedgerEntry;

pub const COLLECTION: &str = "warnings";

fn key(chat_id: i64, user_id: u64) -> Document {
    doc! { "chat_id": chat_id, "user_id": user_id as i64 }
}

fn increment_update(now: DateTime<Utc>) -> Document {
    doc! {
        "$inc": { "count": 1 },
        "$set": { "last_warning_at": now.timestamp_millis() },
    }
}

pub struct WarningRepository {
    collection: Collection<WarningLedgerEntry>,
}

impl WarningRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }

    /// Increment-or-insert, returning the new count.
    pub async fn add(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> StoreResult<u32> {
        let update = increment_update(now);
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let entry = self
            .collection
            .find_one_and_update(key(chat_id, user_id), update)
            .with_options(options)
            .await?
            .ok_or_else(|| StoreError::Unavailable("warning upsert returned no document".into()))?;

        debug!("Warning {} for {} in {}", entry.count, user_id, chat_id);
        Ok(entry.count)
    }

    pub async fn count(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        let entry = self.collection.find_one(key(chat_id, user_id)).await?;
        Ok(entry.map(|e| e.count).unwrap_or(0))
    }

    pub async fn reset(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        let result = self.collection.delete_one(key(chat_id, user_id)).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn reset_chat(&self, chat_id: i64) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "chat_id": chat_id })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson;

    use super::*;

    #[test]
    fn test_increment_update_matches_model() {
        let now = DateTime::from_timestamp(5, 0).unwrap();
        let update = increment_update(now);
        assert_eq!(update.get_document("$inc").unwrap(), &doc! { "count": 1 });
        assert_eq!(
            update.get_document("$set").unwrap().get_i64("last_warning_at").unwrap(),
            5_000
        );

        let entry = WarningLedgerEntry {
            chat_id: -100,
            user_id: 7,
            count: 1,
            last_warning_at: now,
        };
        let stored = bson::to_document(&entry).unwrap();
        assert_eq!(stored.get_i64("last_warning_at").unwrap(), 5_000);
        assert_eq!(stored.get_i64("user_id").unwrap(), 7);
        assert_eq!(key(-100, 7).get_i64("user_id").unwrap(), 7);
    }
}
