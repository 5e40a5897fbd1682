use anyhow::Result;
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::SharedStore;

#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
}

impl UserService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Returns `None` when the username or email is taken.
    pub async fn create_user(&self, username: &str, email: &str) -> Result<Option<User>> {
        let user = User::new(username.trim(), email.trim().to_lowercase());
        let created = self.store.insert_user(user).await?;
        if let Some(user) = &created {
            tracing::info!(user_id = %user.id, username = %user.username, "user created");
        }
        Ok(created)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.store.get_user(user_id).await
    }

    pub async fn grant_moderator(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = self.store.set_moderator(user_id, true).await?;
        if user.is_some() {
            tracing::info!(user_id = %user_id, "moderator role granted");
        }
        Ok(user)
    }
}
