use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::content::{Content, ContentKind};
use crate::domain::moderation::{
    BulkAction, BulkOutcome, FlagOutcome, ModerationFilter, ModerationOrder, ModerationPage,
};
use crate::domain::user::User;

pub type SharedStore = Arc<dyn Store>;

/// Persistence for users, content and flags.
///
/// Every method that touches more than one row is atomic: either all of its
/// writes land or none do.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Returns `None` when the username or email is already taken.
    async fn insert_user(&self, user: User) -> Result<Option<User>>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn set_moderator(&self, id: Uuid, is_moderator: bool) -> Result<Option<User>>;

    async fn insert_content(&self, content: Content) -> Result<Content>;
    async fn get_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<Content>>;
    /// Non-hidden content of one kind, newest first.
    async fn list_visible(&self, kind: ContentKind, limit: i64, offset: i64) -> Result<Vec<Content>>;

    /// Records one flag per (user, content) and bumps `flags_count`.
    async fn add_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<FlagOutcome>;
    /// Returns the new `flags_count`, or `None` when the user had not flagged it.
    async fn remove_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<Option<i32>>;

    async fn moderation_queue(
        &self,
        kind: ContentKind,
        filter: ModerationFilter,
        order: ModerationOrder,
        limit: i64,
        offset: i64,
    ) -> Result<ModerationPage>;

    /// Applies one bulk action to the selected ids of `kind`. Unknown ids are
    /// skipped. `actor_id` is never blocked by `BlockAuthors`.
    async fn apply_bulk(
        &self,
        kind: ContentKind,
        ids: &[Uuid],
        action: BulkAction,
        actor_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<BulkOutcome>;

    /// Hides the user and everything they authored. `false` if no such user.
    async fn block_user(&self, user_id: Uuid, at: OffsetDateTime) -> Result<bool>;

    /// Sets `confirmed_hide_at` on hidden content; `None` if it is not hidden.
    async fn confirm_hide(&self, kind: ContentKind, id: Uuid, at: OffsetDateTime) -> Result<Option<Content>>;
}
