//! Storage errors.

use thiserror::Error;

/// Failure of a persistence call.
///
/// The engine treats every variant as "storage unavailable" and falls back to
/// the safe default for the decision at hand.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
