//! MongoDB database wrapper.

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::repository::{ACTION_LOG_COLLECTION, PER_USER_COLLECTIONS, POLICY_COLLECTION};

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Create the indexes the store relies on.
    ///
    /// The unique (chat_id, user_id) index is what makes the upserting
    /// counter updates safe against duplicate inserts under concurrency.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        for name in PER_USER_COLLECTIONS {
            let index = IndexModel::builder()
                .keys(doc! { "chat_id": 1, "user_id": 1 })
                .options(unique.clone())
                .build();
            self.db
                .collection::<mongodb::bson::Document>(name)
                .create_index(index)
                .await?;
            debug!("Ensured (chat_id, user_id) index on {}", name);
        }

        let policy_index = IndexModel::builder()
            .keys(doc! { "chat_id": 1 })
            .options(unique)
            .build();
        self.db
            .collection::<mongodb::bson::Document>(POLICY_COLLECTION)
            .create_index(policy_index)
            .await?;

        let log_index = IndexModel::builder()
            .keys(doc! { "chat_id": 1, "timestamp": -1 })
            .build();
        self.db
            .collection::<mongodb::bson::Document>(ACTION_LOG_COLLECTION)
            .create_index(log_index)
            .await?;

        info!("MongoDB indexes ready");
        Ok(())
    }
}
