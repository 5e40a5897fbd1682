use axum::{routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new().route("/users", post(handlers::create_user))
}

pub fn content() -> Router<AppState> {
    Router::new()
        .route(
            "/content/:kind",
            get(handlers::list_content).post(handlers::create_content),
        )
        .route("/content/:kind/:id", get(handlers::get_content))
        .route(
            "/content/:kind/:id/flag",
            post(handlers::flag_content).delete(handlers::unflag_content),
        )
}

pub fn moderation() -> Router<AppState> {
    Router::new()
        .route("/moderation/:kind", get(handlers::moderation_index))
        .route("/moderation/:kind/moderate", post(handlers::moderate))
        .route("/moderation/:kind/:id/hide", post(handlers::hide_content))
        .route("/moderation/users/:id/block", post(handlers::block_user))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/moderators/:id", post(handlers::grant_moderator))
        .route("/admin/:kind/:id/confirm_hide", post(handlers::confirm_hide))
}
