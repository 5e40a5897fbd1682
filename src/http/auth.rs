use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use uuid::Uuid;

use crate::app::users::UserService;
use crate::http::AppError;
use crate::AppState;

/// The acting user, as asserted by the upstream authentication gateway.
/// Blocked (hidden) users are rejected here.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_moderator: bool,
}

/// An [`AuthUser`] holding the moderator role.
#[derive(Debug, Clone)]
pub struct Moderator {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminToken;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing x-user-id header"))?;

        let user_id = Uuid::parse_str(header.trim())
            .map_err(|_| AppError::unauthorized("invalid x-user-id header"))?;

        let service = UserService::new(state.store.clone());
        let user = service
            .get_user(user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %user_id, "failed to load acting user");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("unknown user"))?;

        if user.is_hidden() {
            return Err(AppError::forbidden("user is blocked"));
        }

        Ok(AuthUser {
            user_id: user.id,
            is_moderator: user.is_moderator,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Moderator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.is_moderator {
            return Err(AppError::forbidden("moderator access required"));
        }
        Ok(Moderator { user_id: auth.user_id })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if provided != expected {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
