//! Database module exports.

pub mod error;
mod memory;
mod models;
mod mongo;
mod mongo_store;
mod repository;
mod store;

pub use error::StoreResult;
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::Database;
pub use mongo_store::MongoStore;
pub use store::{ModerationStore, chrono_duration};
