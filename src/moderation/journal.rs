//! Best-effort action log writer.

use std::sync::Arc;

use tracing::warn;

use crate::database::{ActionKind, ActionLogEntry, ModerationStore};

use super::clock::Clock;

/// Appends to the action log. A failed append never affects the decision
/// that produced it.
pub struct ActionJournal {
    store: Arc<dyn ModerationStore>,
    clock: Arc<dyn Clock>,
}

impl ActionJournal {
    pub fn new(store: Arc<dyn ModerationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn record(
        &self,
        chat_id: i64,
        user_id: Option<u64>,
        kind: ActionKind,
        detail: impl Into<String>,
    ) {
        let entry = ActionLogEntry::new(chat_id, user_id, kind, detail, self.clock.now());
        if let Err(e) = self.store.log_event(entry).await {
            warn!(
                "Failed to log {} for {:?} in {}: {}",
                kind.as_str(),
                user_id,
                chat_id,
                e
            );
        }
    }
}
