//! Conversation policy repository.
//!
//! Uncached. The moderation engine layers its own hot cache and
//! last-known-good copy on top.

use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use crate::database::Database;
use crate::database::error::StoreResult;
use crate::database::models::ConversationPolicy;

pub const COLLECTION: &str = "policies";

/// Repository for per-chat policies.
pub struct PolicyRepository {
    collection: Collection<ConversationPolicy>,
}

impl PolicyRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }

    pub async fn get(&self, chat_id: i64) -> StoreResult<Option<ConversationPolicy>> {
        let filter = doc! { "chat_id": chat_id };
        let result = self.collection.find_one(filter).await?;
        debug!("DB get policy for {}: {:?}", chat_id, result.is_some());
        Ok(result)
    }

    /// Save policy (upsert).
    pub async fn save(&self, policy: &ConversationPolicy) -> StoreResult<()> {
        let filter = doc! { "chat_id": policy.chat_id };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(filter, policy)
            .with_options(options)
            .await?;

        debug!("Saved policy for {}", policy.chat_id);
        Ok(())
    }
}
