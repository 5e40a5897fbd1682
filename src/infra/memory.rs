use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::content::{Content, ContentKind};
use crate::domain::moderation::{
    BulkAction, BulkOutcome, FlagOutcome, ModerationFilter, ModerationOrder, ModerationPage,
};
use crate::domain::user::User;
use crate::infra::store::Store;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    contents: HashMap<Uuid, Content>,
    /// (user_id, content_id)
    flags: HashSet<(Uuid, Uuid)>,
}

impl State {
    fn content_mut(&mut self, kind: ContentKind, id: Uuid) -> Option<&mut Content> {
        self.contents.get_mut(&id).filter(|content| content.kind == kind)
    }

    /// Returns true when the user was not hidden before.
    fn block_user(&mut self, user_id: Uuid, at: OffsetDateTime) -> Option<bool> {
        let user = self.users.get_mut(&user_id)?;
        let newly_blocked = user.hidden_at.is_none();
        user.hidden_at.get_or_insert(at);

        for content in self.contents.values_mut() {
            if content.author_id == user_id {
                content.hidden_at.get_or_insert(at);
            }
        }
        Some(newly_blocked)
    }
}

/// Process-local store for development and tests. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if taken || state.users.contains_key(&user.id) {
            return Ok(None);
        }
        state.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn set_moderator(&self, id: Uuid, is_moderator: bool) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).map(|user| {
            user.is_moderator = is_moderator;
            user.clone()
        });
        Ok(user)
    }

    async fn insert_content(&self, content: Content) -> Result<Content> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&content.author_id) {
            anyhow::bail!("author {} does not exist", content.author_id);
        }
        if state.contents.contains_key(&content.id) {
            anyhow::bail!("content {} already exists", content.id);
        }
        state.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn get_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<Content>> {
        let state = self.state.read().await;
        Ok(state.contents.get(&id).filter(|content| content.kind == kind).cloned())
    }

    async fn list_visible(&self, kind: ContentKind, limit: i64, offset: i64) -> Result<Vec<Content>> {
        let state = self.state.read().await;
        let mut items: Vec<Content> = state
            .contents
            .values()
            .filter(|content| content.kind == kind && !content.is_hidden())
            .cloned()
            .collect();
        items.sort_by(|a, b| ModerationOrder::CreatedAt.compare(a, b));
        Ok(page(items, limit, offset))
    }

    async fn add_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<FlagOutcome> {
        let mut state = self.state.write().await;
        let visible = state
            .contents
            .get(&content_id)
            .map_or(false, |content| content.kind == kind && !content.is_hidden());
        if !visible {
            return Ok(FlagOutcome::NotFound);
        }

        let inserted = state.flags.insert((user_id, content_id));
        let Some(content) = state.content_mut(kind, content_id) else {
            return Ok(FlagOutcome::NotFound);
        };
        if inserted {
            content.flags_count += 1;
            Ok(FlagOutcome::Flagged { flags_count: content.flags_count })
        } else {
            Ok(FlagOutcome::AlreadyFlagged { flags_count: content.flags_count })
        }
    }

    async fn remove_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<Option<i32>> {
        let mut state = self.state.write().await;
        if state.content_mut(kind, content_id).is_none() {
            return Ok(None);
        }
        if !state.flags.remove(&(user_id, content_id)) {
            return Ok(None);
        }
        let flags_count = state.content_mut(kind, content_id).map(|content| {
            content.flags_count = (content.flags_count - 1).max(0);
            content.flags_count
        });
        Ok(flags_count)
    }

    async fn moderation_queue(
        &self,
        kind: ContentKind,
        filter: ModerationFilter,
        order: ModerationOrder,
        limit: i64,
        offset: i64,
    ) -> Result<ModerationPage> {
        let state = self.state.read().await;
        let mut items: Vec<Content> = state
            .contents
            .values()
            .filter(|content| content.kind == kind && filter.matches(content))
            .cloned()
            .collect();
        items.sort_by(|a, b| order.compare(a, b));
        let total = items.len() as i64;
        Ok(ModerationPage { items: page(items, limit, offset), total })
    }

    async fn apply_bulk(
        &self,
        kind: ContentKind,
        ids: &[Uuid],
        action: BulkAction,
        actor_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<BulkOutcome> {
        let mut state = self.state.write().await;
        let mut outcome = BulkOutcome::default();
        let mut authors = Vec::new();

        let mut seen = HashSet::new();
        for id in ids.iter().filter(|id| seen.insert(**id)) {
            let Some(content) = state.content_mut(kind, *id) else {
                continue;
            };
            let stamp = if action.hides_content() {
                &mut content.hidden_at
            } else {
                &mut content.ignored_flag_at
            };
            if stamp.is_none() {
                *stamp = Some(at);
                outcome.affected += 1;
            }

            if action == BulkAction::BlockAuthors
                && content.author_id != actor_id
                && !authors.contains(&content.author_id)
            {
                authors.push(content.author_id);
            }
        }

        for author_id in authors {
            if state.block_user(author_id, at) == Some(true) {
                outcome.blocked_authors += 1;
            }
        }
        Ok(outcome)
    }

    async fn block_user(&self, user_id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.block_user(user_id, at).is_some())
    }

    async fn confirm_hide(&self, kind: ContentKind, id: Uuid, at: OffsetDateTime) -> Result<Option<Content>> {
        let mut state = self.state.write().await;
        let content = state
            .content_mut(kind, id)
            .filter(|content| content.is_hidden())
            .map(|content| {
                content.confirmed_hide_at.get_or_insert(at);
                content.clone()
            });
        Ok(content)
    }
}

fn page(items: Vec<Content>, limit: i64, offset: i64) -> Vec<Content> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}
