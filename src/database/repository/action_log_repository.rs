//! Append-only action log.

use mongodb::Collection;

use crate::database::Database;
use crate::database::error::StoreResult;
use crate::database::models::ActionLogEntry;

pub const COLLECTION: &str = "action_log";

pub struct ActionLogRepository {
    collection: Collection<ActionLogEntry>,
}

impl ActionLogRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }

    pub async fn append(&self, entry: &ActionLogEntry) -> StoreResult<()> {
        self.collection.insert_one(entry).await?;
        Ok(())
    }
}
