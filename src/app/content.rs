use anyhow::Result;
use uuid::Uuid;

use crate::domain::content::{Content, ContentError, ContentKind, NewContent};
use crate::infra::SharedStore;

#[derive(Clone)]
pub struct ContentService {
    store: SharedStore,
}

impl ContentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Validation failures come back as a [`ContentError`] inside the
    /// `anyhow::Error`.
    pub async fn create(&self, author_id: Uuid, kind: ContentKind, new: NewContent) -> Result<Content> {
        new.validate(kind)?;

        if let Some(target) = new.commentable {
            let visible = self
                .store
                .get_content(target.kind, target.id)
                .await?
                .map_or(false, |parent| !parent.is_hidden());
            if !visible {
                return Err(ContentError::CommentableNotFound.into());
            }
        }

        let content = self.store.insert_content(new.into_content(kind, author_id)).await?;
        tracing::info!(content_id = %content.id, kind = kind.as_db(), author_id = %author_id, "content created");
        Ok(content)
    }

    /// Hidden content is invisible to the public surface.
    pub async fn get_visible(&self, kind: ContentKind, id: Uuid) -> Result<Option<Content>> {
        let content = self.store.get_content(kind, id).await?;
        Ok(content.filter(|content| !content.is_hidden()))
    }

    pub async fn list_visible(&self, kind: ContentKind, limit: i64, offset: i64) -> Result<Vec<Content>> {
        self.store.list_visible(kind, limit, offset).await
    }
}
