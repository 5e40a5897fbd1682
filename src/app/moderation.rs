use anyhow::Result;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::content::{Content, ContentKind};
use crate::domain::moderation::{BulkAction, BulkOutcome, ListingParams, ModerationPage};
use crate::infra::SharedStore;

#[derive(Clone)]
pub struct ModerationService {
    store: SharedStore,
}

impl ModerationService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, kind: ContentKind, params: ListingParams, per_page: i64) -> Result<ModerationPage> {
        self.store
            .moderation_queue(kind, params.filter, params.order, per_page, params.offset(per_page))
            .await
    }

    pub async fn moderate(
        &self,
        actor_id: Uuid,
        kind: ContentKind,
        ids: &[Uuid],
        action: BulkAction,
    ) -> Result<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let outcome = self
            .store
            .apply_bulk(kind, ids, action, actor_id, OffsetDateTime::now_utc())
            .await?;

        tracing::info!(
            actor_id = %actor_id,
            kind = kind.as_db(),
            action = action.as_str(),
            selected = ids.len(),
            affected = outcome.affected,
            blocked_authors = outcome.blocked_authors,
            "bulk moderation applied"
        );
        Ok(outcome)
    }

    /// Hides a single item. Moderators may hide their own content.
    pub async fn hide(&self, actor_id: Uuid, kind: ContentKind, id: Uuid) -> Result<bool> {
        let outcome = self.moderate(actor_id, kind, &[id], BulkAction::Hide).await?;
        Ok(outcome.affected > 0)
    }

    pub async fn block_user(&self, actor_id: Uuid, user_id: Uuid) -> Result<bool> {
        let blocked = self.store.block_user(user_id, OffsetDateTime::now_utc()).await?;
        if blocked {
            tracing::info!(actor_id = %actor_id, user_id = %user_id, "user blocked");
        }
        Ok(blocked)
    }

    pub async fn confirm_hide(&self, kind: ContentKind, id: Uuid) -> Result<Option<Content>> {
        let content = self.store.confirm_hide(kind, id, OffsetDateTime::now_utc()).await?;
        if content.is_some() {
            tracing::info!(content_id = %id, kind = kind.as_db(), "hide confirmed");
        }
        Ok(content)
    }
}
