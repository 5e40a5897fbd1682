use anyhow::Result;
use uuid::Uuid;

use crate::domain::content::ContentKind;
use crate::domain::moderation::FlagOutcome;
use crate::infra::SharedStore;

#[derive(Clone)]
pub struct FlagService {
    store: SharedStore,
}

impl FlagService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Flagging the same content twice is a no-op for the counter.
    pub async fn flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<FlagOutcome> {
        let outcome = self.store.add_flag(user_id, kind, content_id).await?;
        if let FlagOutcome::Flagged { flags_count } = outcome {
            tracing::info!(user_id = %user_id, content_id = %content_id, kind = kind.as_db(), flags_count, "content flagged");
        }
        Ok(outcome)
    }

    pub async fn unflag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<Option<i32>> {
        let flags_count = self.store.remove_flag(user_id, kind, content_id).await?;
        if let Some(flags_count) = flags_count {
            tracing::info!(user_id = %user_id, content_id = %content_id, kind = kind.as_db(), flags_count, "flag removed");
        }
        Ok(flags_count)
    }
}
