#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use civica::app::flags::FlagService;
use civica::domain::content::{Commentable, Content, ContentKind};
use civica::domain::moderation::BulkAction;
use civica::domain::user::User;
use civica::infra::memory::MemoryStore;
use civica::infra::Store;
use civica::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";
pub const DEFAULT_PER_PAGE: i64 = 50;

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

fn next_sequence() -> u32 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1
}

// ---------------------------------------------------------------------------
// TestApp: one fresh in-memory store per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    /// Titles (or comment bodies) of the listed items, in order.
    pub fn labels(&self) -> Vec<String> {
        self.json()["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        item["title"]
                            .as_str()
                            .or_else(|| item["body"].as_str())
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.json()["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"].as_str())
                    .filter_map(|id| Uuid::parse_str(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The entry of a filter/order menu flagged as current.
    pub fn current(&self, menu: &str) -> String {
        self.json()[menu]
            .as_array()
            .and_then(|entries| entries.iter().find(|entry| entry["current"] == Value::Bool(true)))
            .and_then(|entry| entry["value"].as_str())
            .unwrap_or_default()
            .to_string()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_per_page(DEFAULT_PER_PAGE)
    }

    pub fn with_per_page(per_page: i64) -> Self {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
            admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
            moderation_per_page: per_page,
        };
        let router = civica::http::router(state.clone());
        TestApp { router, state }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            location,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers; `as_user` fills the x-user-id header
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, as_user: Option<Uuid>) -> TestResponse {
        let user = as_user.map(|id| id.to_string());
        let headers: Vec<(&str, &str)> = user.iter().map(|id| ("x-user-id", id.as_str())).collect();
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, as_user: Option<Uuid>) -> TestResponse {
        let user = as_user.map(|id| id.to_string());
        let headers: Vec<(&str, &str)> = user.iter().map(|id| ("x-user-id", id.as_str())).collect();
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn post(&self, path: &str, as_user: Option<Uuid>) -> TestResponse {
        let user = as_user.map(|id| id.to_string());
        let headers: Vec<(&str, &str)> = user.iter().map(|id| ("x-user-id", id.as_str())).collect();
        self.request(Method::POST, path, None, &headers).await
    }

    pub async fn delete(&self, path: &str, as_user: Option<Uuid>) -> TestResponse {
        let user = as_user.map(|id| id.to_string());
        let headers: Vec<(&str, &str)> = user.iter().map(|id| ("x-user-id", id.as_str())).collect();
        self.request(Method::DELETE, path, None, &headers).await
    }

    /// POST with an admin token in the x-admin-token header.
    pub async fn post_admin(&self, path: &str, admin_token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, None, &headers).await
    }

    /// Bulk-moderate `ids` from the listing described by `query`.
    pub async fn moderate(
        &self,
        kind: &str,
        query: &str,
        ids: &[Uuid],
        action: &str,
        moderator: Uuid,
    ) -> TestResponse {
        let path = if query.is_empty() {
            format!("/v1/moderation/{kind}/moderate")
        } else {
            format!("/v1/moderation/{kind}/moderate?{query}")
        };
        self.post_json(
            &path,
            serde_json::json!({ "ids": ids, "action": action }),
            Some(moderator),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    pub async fn create_user(&self) -> User {
        let n = next_sequence();
        let user = User::new(format!("Manuela{n}"), format!("manuela{n}@consul.dev"));
        self.state
            .store
            .insert_user(user)
            .await
            .expect("insert user failed")
            .expect("username collision")
    }

    pub async fn create_hidden_user(&self) -> User {
        let user = self.create_user().await;
        self.state
            .store
            .block_user(user.id, OffsetDateTime::now_utc())
            .await
            .expect("block user failed");
        self.reload_user(user.id).await
    }

    pub async fn create_moderator(&self) -> User {
        let user = self.create_user().await;
        self.state
            .store
            .set_moderator(user.id, true)
            .await
            .expect("set moderator failed")
            .expect("moderator user missing")
    }

    pub fn proposal(&self) -> ContentFactory<'_> {
        let n = next_sequence();
        ContentFactory::new(self, ContentKind::Proposal)
            .title(&format!("Proposal {n} title"))
            .summary(&format!("In summary, what we want is... {n}"))
            .body("Proposal description")
    }

    pub fn debate(&self) -> ContentFactory<'_> {
        let n = next_sequence();
        ContentFactory::new(self, ContentKind::Debate)
            .title(&format!("Debate {n} title"))
            .body("Debate description")
    }

    pub fn comment(&self, on: &Content) -> ContentFactory<'_> {
        let n = next_sequence();
        ContentFactory::new(self, ContentKind::Comment)
            .body(&format!("Comment body {n}"))
            .commentable(on)
    }

    /// Shorthand for `proposal().create()`.
    pub async fn create_proposal(&self) -> Content {
        self.proposal().create().await
    }

    pub async fn reload(&self, content: &Content) -> Content {
        self.state
            .store
            .get_content(content.kind, content.id)
            .await
            .expect("load content failed")
            .expect("content missing")
    }

    pub async fn reload_user(&self, id: Uuid) -> User {
        self.state
            .store
            .get_user(id)
            .await
            .expect("load user failed")
            .expect("user missing")
    }

    pub fn admin_token(&self) -> &str {
        TEST_ADMIN_TOKEN
    }
}

/// Builds persisted content in a given moderation state.
pub struct ContentFactory<'a> {
    app: &'a TestApp,
    kind: ContentKind,
    author_id: Option<Uuid>,
    title: Option<String>,
    summary: Option<String>,
    body: String,
    commentable: Option<Commentable>,
    created_at: Option<OffsetDateTime>,
    flags_count: i32,
    flagged_by: usize,
    hidden: bool,
    ignored_flag: bool,
    confirmed_hide: bool,
}

impl<'a> ContentFactory<'a> {
    fn new(app: &'a TestApp, kind: ContentKind) -> Self {
        Self {
            app,
            kind,
            author_id: None,
            title: None,
            summary: None,
            body: String::new(),
            commentable: None,
            created_at: None,
            flags_count: 0,
            flagged_by: 0,
            hidden: false,
            ignored_flag: false,
            confirmed_hide: false,
        }
    }

    pub fn author(mut self, author_id: Uuid) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn commentable(mut self, on: &Content) -> Self {
        self.commentable = Some(Commentable { kind: on.kind, id: on.id });
        self
    }

    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn created_ago(self, ago: Duration) -> Self {
        self.created_at(OffsetDateTime::now_utc() - ago)
    }

    pub fn archived(self) -> Self {
        self.created_ago(Duration::days(25 * 30))
    }

    /// Sets the cached counter directly, without flag rows.
    pub fn flags_count(mut self, flags_count: i32) -> Self {
        self.flags_count = flags_count;
        self
    }

    /// One real flag from a fresh user.
    pub fn flagged(mut self) -> Self {
        self.flagged_by += 1;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_ignored_flag(mut self) -> Self {
        self.ignored_flag = true;
        self
    }

    pub fn with_confirmed_hide(mut self) -> Self {
        self.hidden = true;
        self.confirmed_hide = true;
        self
    }

    pub async fn create(self) -> Content {
        let app = self.app;
        let author_id = match self.author_id {
            Some(id) => id,
            None => app.create_user().await.id,
        };

        let mut content = Content::new(self.kind, author_id, self.body);
        content.title = self.title;
        content.summary = self.summary;
        content.commentable = self.commentable;
        content.flags_count = self.flags_count;
        if let Some(created_at) = self.created_at {
            content.created_at = created_at;
        }

        let store = &app.state.store;
        let content = store.insert_content(content).await.expect("insert content failed");

        let flags = FlagService::new(store.clone());
        for _ in 0..self.flagged_by {
            let flagger = app.create_user().await;
            flags
                .flag(flagger.id, content.kind, content.id)
                .await
                .expect("flag failed");
        }

        let now = OffsetDateTime::now_utc();
        let mut actions = Vec::new();
        if self.ignored_flag {
            actions.push(BulkAction::IgnoreFlag);
        }
        if self.hidden {
            actions.push(BulkAction::Hide);
        }
        for action in actions {
            store
                .apply_bulk(content.kind, &[content.id], action, author_id, now)
                .await
                .expect("apply moderation failed");
        }
        if self.confirmed_hide {
            store
                .confirm_hide(content.kind, content.id, now)
                .await
                .expect("confirm hide failed");
        }

        app.reload(&content).await
    }
}

/// A fresh app with the default moderation page size.
pub fn app() -> TestApp {
    TestApp::new()
}
