use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser, Moderator, ADMIN_TOKEN_HEADER, USER_ID_HEADER};
pub use error::AppError;

/// All routes live under `/v1`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::health())
        .merge(routes::users())
        .merge(routes::content())
        .merge(routes::moderation())
        .merge(routes::admin());

    Router::new().nest("/v1", api).with_state(state)
}
