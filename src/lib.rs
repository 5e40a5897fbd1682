pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub admin_token: Option<String>,
    pub moderation_per_page: i64,
}
