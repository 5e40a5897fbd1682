use anyhow::{anyhow, Result};
use axum::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::content::{Commentable, Content, ContentKind};
use crate::domain::moderation::{
    BulkAction, BulkOutcome, FlagOutcome, ModerationFilter, ModerationOrder, ModerationPage,
};
use crate::domain::user::User;
use crate::infra::store::Store;

const USER_COLUMNS: &str = "id, username, email, is_moderator, created_at, hidden_at, confirmed_hide_at";

const CONTENT_COLUMNS: &str = "id, kind, author_id, title, summary, body, commentable_kind, \
     commentable_id, flags_count, created_at, hidden_at, ignored_flag_at, confirmed_hide_at";

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow!("missing required env var: DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        is_moderator: row.get("is_moderator"),
        created_at: row.get("created_at"),
        hidden_at: row.get("hidden_at"),
        confirmed_hide_at: row.get("confirmed_hide_at"),
    }
}

fn content_from_row(row: &PgRow) -> Result<Content> {
    let kind: String = row.get("kind");
    let kind = ContentKind::from_db(&kind).ok_or_else(|| anyhow!("unknown content kind: {}", kind))?;

    let commentable_kind: Option<String> = row.get("commentable_kind");
    let commentable_id: Option<Uuid> = row.get("commentable_id");
    let commentable = match (commentable_kind, commentable_id) {
        (Some(value), Some(id)) => {
            let kind = ContentKind::from_db(&value)
                .ok_or_else(|| anyhow!("unknown commentable kind: {}", value))?;
            Some(Commentable { kind, id })
        }
        _ => None,
    };

    Ok(Content {
        id: row.get("id"),
        kind,
        author_id: row.get("author_id"),
        title: row.get("title"),
        summary: row.get("summary"),
        body: row.get("body"),
        commentable,
        flags_count: row.get("flags_count"),
        created_at: row.get("created_at"),
        hidden_at: row.get("hidden_at"),
        ignored_flag_at: row.get("ignored_flag_at"),
        confirmed_hide_at: row.get("confirmed_hide_at"),
    })
}

fn filter_clause(filter: ModerationFilter) -> &'static str {
    match filter {
        ModerationFilter::All => "",
        ModerationFilter::PendingFlagReview => " AND flags_count > 0 AND ignored_flag_at IS NULL",
        ModerationFilter::WithIgnoredFlag => " AND ignored_flag_at IS NOT NULL",
    }
}

fn order_clause(order: ModerationOrder) -> &'static str {
    match order {
        ModerationOrder::Flags => "flags_count DESC, created_at DESC, id DESC",
        ModerationOrder::CreatedAt => "created_at DESC, id DESC",
    }
}

#[async_trait]
impl Store for Db {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT DO NOTHING \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_moderator)
        .bind(user.created_at)
        .bind(user.hidden_at)
        .bind(user.confirmed_hide_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn set_moderator(&self, id: Uuid, is_moderator: bool) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_moderator = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(is_moderator)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_content(&self, content: Content) -> Result<Content> {
        let row = sqlx::query(&format!(
            "INSERT INTO contents ({CONTENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(content.id)
        .bind(content.kind.as_db())
        .bind(content.author_id)
        .bind(&content.title)
        .bind(&content.summary)
        .bind(&content.body)
        .bind(content.commentable.map(|target| target.kind.as_db()))
        .bind(content.commentable.map(|target| target.id))
        .bind(content.flags_count)
        .bind(content.created_at)
        .bind(content.hidden_at)
        .bind(content.ignored_flag_at)
        .bind(content.confirmed_hide_at)
        .fetch_one(&self.pool)
        .await?;

        content_from_row(&row)
    }

    async fn get_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<Content>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1 AND kind = $2"
        ))
        .bind(id)
        .bind(kind.as_db())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(content_from_row).transpose()
    }

    async fn list_visible(&self, kind: ContentKind, limit: i64, offset: i64) -> Result<Vec<Content>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents \
             WHERE kind = $1 AND hidden_at IS NULL \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(kind.as_db())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(content_from_row).collect()
    }

    async fn add_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<FlagOutcome> {
        let mut tx = self.pool.begin().await?;
        let current: Option<i32> = sqlx::query_scalar(
            "SELECT flags_count FROM contents \
             WHERE id = $1 AND kind = $2 AND hidden_at IS NULL \
             FOR UPDATE",
        )
        .bind(content_id)
        .bind(kind.as_db())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(FlagOutcome::NotFound);
        };

        let inserted = sqlx::query(
            "INSERT INTO flags (user_id, content_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, content_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(content_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(FlagOutcome::AlreadyFlagged { flags_count: current });
        }

        let flags_count: i32 = sqlx::query_scalar(
            "UPDATE contents SET flags_count = flags_count + 1 WHERE id = $1 RETURNING flags_count",
        )
        .bind(content_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(FlagOutcome::Flagged { flags_count })
    }

    async fn remove_flag(&self, user_id: Uuid, kind: ContentKind, content_id: Uuid) -> Result<Option<i32>> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(
            "DELETE FROM flags \
             WHERE user_id = $1 AND content_id = $2 \
               AND EXISTS (SELECT 1 FROM contents WHERE id = $2 AND kind = $3)",
        )
        .bind(user_id)
        .bind(content_id)
        .bind(kind.as_db())
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let flags_count: i32 = sqlx::query_scalar(
            "UPDATE contents SET flags_count = GREATEST(flags_count - 1, 0) \
             WHERE id = $1 RETURNING flags_count",
        )
        .bind(content_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(flags_count))
    }

    async fn moderation_queue(
        &self,
        kind: ContentKind,
        filter: ModerationFilter,
        order: ModerationOrder,
        limit: i64,
        offset: i64,
    ) -> Result<ModerationPage> {
        let predicate = format!("kind = $1 AND hidden_at IS NULL{}", filter_clause(filter));

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contents WHERE {predicate}"))
            .bind(kind.as_db())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE {predicate} \
             ORDER BY {} LIMIT $2 OFFSET $3",
            order_clause(order)
        ))
        .bind(kind.as_db())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(content_from_row).collect::<Result<Vec<_>>>()?;
        Ok(ModerationPage { items, total })
    }

    async fn apply_bulk(
        &self,
        kind: ContentKind,
        ids: &[Uuid],
        action: BulkAction,
        actor_id: Uuid,
        at: OffsetDateTime,
    ) -> Result<BulkOutcome> {
        let column = if action.hides_content() { "hidden_at" } else { "ignored_flag_at" };

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(&format!(
            "UPDATE contents SET {column} = $3 \
             WHERE kind = $1 AND id = ANY($2) AND {column} IS NULL"
        ))
        .bind(kind.as_db())
        .bind(ids)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        let mut outcome = BulkOutcome {
            affected: updated.rows_affected(),
            blocked_authors: 0,
        };

        if action == BulkAction::BlockAuthors {
            // authors of every selected item, hidden before or not
            let mut authors: Vec<Uuid> = sqlx::query_scalar(
                "SELECT author_id FROM contents WHERE kind = $1 AND id = ANY($2)",
            )
            .bind(kind.as_db())
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;
            authors.retain(|author_id| *author_id != actor_id);
            authors.sort();
            authors.dedup();

            if !authors.is_empty() {
                let blocked = sqlx::query(
                    "UPDATE users SET hidden_at = $2 WHERE id = ANY($1) AND hidden_at IS NULL",
                )
                .bind(&authors)
                .bind(at)
                .execute(&mut *tx)
                .await?;
                outcome.blocked_authors = blocked.rows_affected();

                sqlx::query(
                    "UPDATE contents SET hidden_at = COALESCE(hidden_at, $2) WHERE author_id = ANY($1)",
                )
                .bind(&authors)
                .bind(at)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn block_user(&self, user_id: Uuid, at: OffsetDateTime) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE users SET hidden_at = COALESCE(hidden_at, $2) WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE contents SET hidden_at = COALESCE(hidden_at, $2) WHERE author_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn confirm_hide(&self, kind: ContentKind, id: Uuid, at: OffsetDateTime) -> Result<Option<Content>> {
        let row = sqlx::query(&format!(
            "UPDATE contents SET confirmed_hide_at = COALESCE(confirmed_hide_at, $3) \
             WHERE id = $1 AND kind = $2 AND hidden_at IS NOT NULL \
             RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(id)
        .bind(kind.as_db())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(content_from_row).transpose()
    }
}
