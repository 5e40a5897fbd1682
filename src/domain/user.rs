use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_moderator: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set when the user is blocked by a moderator.
    #[serde(with = "time::serde::rfc3339::option")]
    pub hidden_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub confirmed_hide_at: Option<OffsetDateTime>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            is_moderator: false,
            created_at: OffsetDateTime::now_utc(),
            hidden_at: None,
            confirmed_hide_at: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_at.is_some()
    }
}
