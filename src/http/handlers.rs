use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::content::ContentService;
use crate::app::flags::FlagService;
use crate::app::moderation::ModerationService;
use crate::app::users::UserService;
use crate::domain::content::{Content, ContentError, ContentKind, NewContent};
use crate::domain::moderation::{
    parse_page, BulkAction, FlagOutcome, ListingParams, ModerationFilter, ModerationOrder,
};
use crate::domain::user::User;
use crate::http::{AdminToken, AppError, AuthUser, Moderator};
use crate::AppState;

const PUBLIC_PAGE_SIZE: i64 = 25;
const MAX_USERNAME_LEN: usize = 60;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

fn parse_kind(segment: &str) -> Result<ContentKind, AppError> {
    ContentKind::from_path(segment).ok_or_else(|| AppError::not_found("unknown content type"))
}

fn moderation_path(kind: ContentKind) -> String {
    format!("/v1/moderation/{}", kind.as_path())
}

fn moderation_url(kind: ContentKind, params: ListingParams) -> String {
    format!("{}?{}", moderation_path(kind), params.query_string())
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() { "ok" } else { "degraded" };
    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    let email = payload.email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::bad_request("username and email are required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::bad_request("username must be at most 60 characters"));
    }
    if !email.contains('@') {
        return Err(AppError::bad_request("invalid email"));
    }

    let service = UserService::new(state.store.clone());
    let user = service
        .create_user(username, email)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create user");
            AppError::internal("failed to create user")
        })?;

    user.map(Json)
        .ok_or_else(|| AppError::conflict("username or email already taken"))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Serialize)]
pub struct ContentListResponse {
    pub items: Vec<Content>,
    pub page: u32,
    pub next_page: Option<u32>,
}

pub async fn list_content(
    Path(kind): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ContentListResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let page = parse_page(query.page.as_deref());
    let offset = i64::from(page - 1) * PUBLIC_PAGE_SIZE;

    let service = ContentService::new(state.store.clone());
    let mut items = service
        .list_visible(kind, PUBLIC_PAGE_SIZE + 1, offset)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, kind = kind.as_db(), "failed to list content");
            AppError::internal("failed to list content")
        })?;

    let next_page = if items.len() > PUBLIC_PAGE_SIZE as usize {
        items.truncate(PUBLIC_PAGE_SIZE as usize);
        Some(page + 1)
    } else {
        None
    };

    Ok(Json(ContentListResponse { items, page, next_page }))
}

pub async fn get_content(
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<Content>, AppError> {
    let kind = parse_kind(&kind)?;
    let service = ContentService::new(state.store.clone());
    let content = service
        .get_visible(kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, content_id = %id, "failed to get content");
            AppError::internal("failed to get content")
        })?;

    content
        .map(Json)
        .ok_or_else(|| AppError::not_found("content not found"))
}

pub async fn create_content(
    auth: AuthUser,
    Path(kind): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<NewContent>, JsonRejection>,
) -> Result<Json<Content>, AppError> {
    let Json(payload) = payload?;
    let kind = parse_kind(&kind)?;
    let service = ContentService::new(state.store.clone());
    let content = service
        .create(auth.user_id, kind, payload)
        .await
        .map_err(|err| {
            if let Some(invalid) = err.downcast_ref::<ContentError>() {
                return AppError::bad_request(invalid.to_string());
            }
            tracing::error!(error = ?err, author_id = %auth.user_id, "failed to create content");
            AppError::internal("failed to create content")
        })?;

    Ok(Json(content))
}

#[derive(Serialize)]
pub struct UnflagResponse {
    pub flags_count: i32,
}

pub async fn flag_content(
    auth: AuthUser,
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<FlagOutcome>, AppError> {
    let kind = parse_kind(&kind)?;
    let service = FlagService::new(state.store.clone());
    let outcome = service
        .flag(auth.user_id, kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, content_id = %id, "failed to flag content");
            AppError::internal("failed to flag content")
        })?;

    match outcome {
        FlagOutcome::NotFound => Err(AppError::not_found("content not found")),
        outcome => Ok(Json(outcome)),
    }
}

pub async fn unflag_content(
    auth: AuthUser,
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<UnflagResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let service = FlagService::new(state.store.clone());
    let flags_count = service
        .unflag(auth.user_id, kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, content_id = %id, "failed to unflag content");
            AppError::internal("failed to unflag content")
        })?;

    flags_count
        .map(|flags_count| Json(UnflagResponse { flags_count }))
        .ok_or_else(|| AppError::not_found("flag not found"))
}

#[derive(Deserialize)]
pub struct ModerationQuery {
    pub filter: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

impl ModerationQuery {
    fn params(&self) -> ListingParams {
        ListingParams::from_query(
            self.filter.as_deref(),
            self.order.as_deref(),
            self.page.as_deref(),
        )
    }
}

#[derive(Serialize)]
pub struct MenuEntry {
    pub value: &'static str,
    pub url: String,
    pub current: bool,
}

#[derive(Serialize)]
pub struct ModerationListResponse {
    pub kind: ContentKind,
    pub filter: ModerationFilter,
    pub order: ModerationOrder,
    pub page: u32,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub filters: Vec<MenuEntry>,
    pub orders: Vec<MenuEntry>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    /// Where the bulk form posts to; carries the current filter, order and page.
    pub moderate_url: String,
    pub items: Vec<Content>,
}

pub async fn moderation_index(
    _moderator: Moderator,
    Path(kind): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<ModerationListResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let params = query.params();
    let per_page = state.moderation_per_page;

    let service = ModerationService::new(state.store.clone());
    let listing = service
        .list(kind, params, per_page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, kind = kind.as_db(), "failed to list moderation queue");
            AppError::internal("failed to list moderation queue")
        })?;

    let filters = ModerationFilter::MENU
        .into_iter()
        .map(|filter| MenuEntry {
            value: filter.as_str(),
            url: moderation_url(kind, params.with_filter(filter)),
            current: filter == params.filter,
        })
        .collect();

    let orders = ModerationOrder::MENU
        .into_iter()
        .map(|order| MenuEntry {
            value: order.as_str(),
            url: moderation_url(kind, params.with_order(order)),
            current: order == params.order,
        })
        .collect();

    let total_pages = (listing.total + per_page - 1) / per_page;
    let prev_url = (params.page > 1).then(|| moderation_url(kind, params.with_page(params.page - 1)));
    let next_url = (i64::from(params.page) < total_pages)
        .then(|| moderation_url(kind, params.with_page(params.page + 1)));

    Ok(Json(ModerationListResponse {
        kind,
        filter: params.filter,
        order: params.order,
        page: params.page,
        per_page,
        total: listing.total,
        total_pages,
        filters,
        orders,
        prev_url,
        next_url,
        moderate_url: format!("{}/moderate?{}", moderation_path(kind), params.query_string()),
        items: listing.items,
    }))
}

#[derive(Deserialize)]
pub struct ModerateRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
    pub action: BulkAction,
}

#[derive(Serialize)]
pub struct ModerateResponse {
    pub affected: u64,
    pub blocked_authors: u64,
    pub location: String,
}

/// Applies a bulk action and sends the moderator back to the listing they
/// came from.
pub async fn moderate(
    moderator: Moderator,
    Path(kind): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let kind = parse_kind(&kind)?;
    let service = ModerationService::new(state.store.clone());
    let outcome = service
        .moderate(moderator.user_id, kind, &payload.ids, payload.action)
        .await
        .map_err(|err| {
            tracing::error!(
                error = ?err,
                actor_id = %moderator.user_id,
                action = payload.action.as_str(),
                "failed to apply bulk moderation"
            );
            AppError::internal("failed to apply bulk moderation")
        })?;

    let location = moderation_url(kind, query.params());
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.clone())],
        Json(ModerateResponse {
            affected: outcome.affected,
            blocked_authors: outcome.blocked_authors,
            location,
        }),
    ))
}

pub async fn hide_content(
    moderator: Moderator,
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let kind = parse_kind(&kind)?;
    let service = ModerationService::new(state.store.clone());
    let hidden = service
        .hide(moderator.user_id, kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, actor_id = %moderator.user_id, content_id = %id, "failed to hide content");
            AppError::internal("failed to hide content")
        })?;

    if hidden {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("content not found"))
    }
}

pub async fn block_user(
    moderator: Moderator,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if id == moderator.user_id {
        return Err(AppError::bad_request("moderators cannot block themselves"));
    }

    let service = ModerationService::new(state.store.clone());
    let blocked = service
        .block_user(moderator.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, actor_id = %moderator.user_id, user_id = %id, "failed to block user");
            AppError::internal("failed to block user")
        })?;

    if blocked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("user not found"))
    }
}

pub async fn grant_moderator(
    _admin: AdminToken,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = UserService::new(state.store.clone());
    let user = service
        .grant_moderator(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to grant moderator role");
            AppError::internal("failed to grant moderator role")
        })?;

    user.map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn confirm_hide(
    _admin: AdminToken,
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<Content>, AppError> {
    let kind = parse_kind(&kind)?;
    let service = ModerationService::new(state.store.clone());
    let content = service
        .confirm_hide(kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, content_id = %id, "failed to confirm hide");
            AppError::internal("failed to confirm hide")
        })?;

    content
        .map(Json)
        .ok_or_else(|| AppError::not_found("hidden content not found"))
}
