//! A small in-process stand-in for the hosted gateway: the auth endpoints under
//! `/auth/v1` and the `stories` table under `/rest/v1`, with per-user row scoping
//! and the gateway's error payloads.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const ANON_KEY: &str = "test-anon-key";

struct Account {
    id: Uuid,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    stories: Vec<Value>,
    next_id: i64,
    issue_expired: bool,
    requests: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeSupabase {
    inner: Arc<Mutex<Inner>>,
}

impl FakeSupabase {
    /// Serves the fake on an ephemeral port and returns its base URL.
    pub async fn spawn() -> (Self, String) {
        let fake = Self::default();
        fake.inner.lock().unwrap().next_id = 1;
        let router = Router::new()
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/user", get(user))
            .route(
                "/rest/v1/stories",
                get(list_stories)
                    .post(insert_story)
                    .patch(update_story)
                    .delete(delete_story),
            )
            .with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (fake, format!("http://{}", addr))
    }

    pub fn register_confirmed(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().accounts.insert(
            email.to_string(),
            Account { id, password: password.to_string(), confirmed: true },
        );
        id
    }

    pub fn confirm(&self, email: &str) {
        if let Some(account) = self.inner.lock().unwrap().accounts.get_mut(email) {
            account.confirmed = true;
        }
    }

    /// Sessions issued from now on are already past their expiry.
    pub fn issue_expired_sessions(&self, expired: bool) {
        self.inner.lock().unwrap().issue_expired = expired;
    }

    /// Invalidates every issued access and refresh token.
    pub fn revoke_sessions(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.access_tokens.clear();
        inner.refresh_tokens.clear();
    }

    /// Inserts a row directly, as another client of the gateway would.
    pub fn seed_story(&self, owner: Uuid, title: &str, mood: &str) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.new_row(owner, title, "seeded", mood);
        let id = row["id"].as_i64().unwrap();
        inner.stories.push(row);
        id
    }

    pub fn story_count(&self) -> usize {
        self.inner.lock().unwrap().stories.len()
    }

    /// `METHOD path` of every request received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Inner {
    fn new_row(&mut self, owner: Uuid, title: &str, content: &str, mood: &str) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(id);
        json!({
            "id": id,
            "user_id": owner,
            "title": title,
            "content": content,
            "mood": mood,
            "created_at": created_at.to_rfc3339(),
        })
    }

    fn user_json(&self, email: &str) -> Option<Value> {
        self.accounts.get(email).map(|a| {
            json!({
                "id": a.id,
                "aud": "authenticated",
                "email": email,
                "created_at": "2024-01-01T09:00:00Z",
            })
        })
    }

    fn email_of(&self, id: Uuid) -> Option<String> {
        self.accounts
            .iter()
            .find(|(_, a)| a.id == id)
            .map(|(email, _)| email.clone())
    }

    fn issue_session(&mut self, id: Uuid) -> Value {
        let access = Uuid::new_v4().to_string();
        let refresh = Uuid::new_v4().to_string();
        self.access_tokens.insert(access.clone(), id);
        self.refresh_tokens.insert(refresh.clone(), id);
        let expires_in = if self.issue_expired { 0 } else { 3600 };
        let email = self.email_of(id).unwrap_or_default();
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": expires_in,
            "expires_at": (Utc::now() + Duration::seconds(expires_in)).timestamp(),
            "refresh_token": refresh,
            "user": self.user_json(&email),
        })
    }
}

fn auth_error(status: StatusCode, code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": code, "msg": msg })),
    )
        .into_response()
}

fn table_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "details": null, "hint": null, "message": message })),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Records the request and checks the project key; yields the caller's user id
/// when the bearer token is a live access token.
fn enter(fake: &FakeSupabase, label: &str, headers: &HeaderMap) -> Result<Option<Uuid>, Response> {
    let mut inner = fake.inner.lock().unwrap();
    inner.requests.push(label.to_string());
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return Err(table_error(StatusCode::UNAUTHORIZED, "PGRST301", "No API key found in request"));
    }
    Ok(bearer(headers).and_then(|t| inner.access_tokens.get(&t).copied()))
}

fn eq_filter(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.strip_prefix("eq.")).map(str::to_string)
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

async fn signup(State(fake): State<FakeSupabase>, headers: HeaderMap, Json(body): Json<Credentials>) -> Response {
    if let Err(r) = enter(&fake, "POST /auth/v1/signup", &headers) {
        return r;
    }
    let mut inner = fake.inner.lock().unwrap();
    if inner.accounts.contains_key(&body.email) {
        return auth_error(StatusCode::UNPROCESSABLE_ENTITY, "user_already_exists", "User already registered");
    }
    inner.accounts.insert(
        body.email.clone(),
        Account { id: Uuid::new_v4(), password: body.password, confirmed: false },
    );
    Json(inner.user_json(&body.email)).into_response()
}

async fn token(
    State(fake): State<FakeSupabase>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = enter(&fake, "POST /auth/v1/token", &headers) {
        return r;
    }
    let mut inner = fake.inner.lock().unwrap();
    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let Ok(creds) = serde_json::from_value::<Credentials>(body) else {
                return auth_error(StatusCode::BAD_REQUEST, "validation_failed", "Missing credentials");
            };
            let account = inner
                .accounts
                .get(&creds.email)
                .filter(|a| a.password == creds.password)
                .map(|a| (a.id, a.confirmed));
            match account {
                None => auth_error(StatusCode::BAD_REQUEST, "invalid_credentials", "Invalid login credentials"),
                Some((_, false)) => auth_error(StatusCode::BAD_REQUEST, "email_not_confirmed", "Email not confirmed"),
                Some((id, true)) => Json(inner.issue_session(id)).into_response(),
            }
        }
        Some("refresh_token") => {
            let Ok(body) = serde_json::from_value::<RefreshBody>(body) else {
                return auth_error(StatusCode::BAD_REQUEST, "validation_failed", "Missing refresh token");
            };
            match inner.refresh_tokens.remove(&body.refresh_token) {
                Some(id) => {
                    inner.issue_expired = false;
                    Json(inner.issue_session(id)).into_response()
                }
                None => auth_error(StatusCode::BAD_REQUEST, "refresh_token_not_found", "Invalid Refresh Token: Refresh Token Not Found"),
            }
        }
        _ => auth_error(StatusCode::BAD_REQUEST, "validation_failed", "Unsupported grant type"),
    }
}

async fn logout(State(fake): State<FakeSupabase>, headers: HeaderMap) -> Response {
    if let Err(r) = enter(&fake, "POST /auth/v1/logout", &headers) {
        return r;
    }
    let mut inner = fake.inner.lock().unwrap();
    match bearer(&headers).and_then(|t| inner.access_tokens.remove(&t)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => auth_error(StatusCode::UNAUTHORIZED, "bad_jwt", "invalid JWT"),
    }
}

async fn user(State(fake): State<FakeSupabase>, headers: HeaderMap) -> Response {
    let caller = match enter(&fake, "GET /auth/v1/user", &headers) {
        Ok(caller) => caller,
        Err(r) => return r,
    };
    let inner = fake.inner.lock().unwrap();
    match caller.and_then(|id| inner.email_of(id)) {
        Some(email) => Json(inner.user_json(&email)).into_response(),
        None => auth_error(StatusCode::UNAUTHORIZED, "bad_jwt", "invalid JWT"),
    }
}

async fn list_stories(State(fake): State<FakeSupabase>, headers: HeaderMap) -> Response {
    let caller = match enter(&fake, "GET /rest/v1/stories", &headers) {
        Ok(caller) => caller,
        Err(r) => return r,
    };
    let Some(caller) = caller else {
        return Json(Vec::<Value>::new()).into_response();
    };
    let inner = fake.inner.lock().unwrap();
    let mut rows: Vec<Value> = inner
        .stories
        .iter()
        .filter(|row| row["user_id"] == json!(caller))
        .cloned()
        .collect();
    rows.sort_by(|a, b| b["created_at"].as_str().cmp(&a["created_at"].as_str()));
    Json(rows).into_response()
}

async fn insert_story(State(fake): State<FakeSupabase>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let caller = match enter(&fake, "POST /rest/v1/stories", &headers) {
        Ok(caller) => caller,
        Err(r) => return r,
    };
    if caller.is_none() || body["user_id"] != json!(caller) {
        return table_error(
            StatusCode::FORBIDDEN,
            "42501",
            "new row violates row-level security policy for table \"stories\"",
        );
    }
    let mut inner = fake.inner.lock().unwrap();
    let row = inner.new_row(
        caller.unwrap_or_default(),
        body["title"].as_str().unwrap_or_default(),
        body["content"].as_str().unwrap_or_default(),
        body["mood"].as_str().unwrap_or_default(),
    );
    inner.stories.push(row.clone());
    (StatusCode::CREATED, Json(row)).into_response()
}

async fn update_story(
    State(fake): State<FakeSupabase>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let caller = match enter(&fake, "PATCH /rest/v1/stories", &headers) {
        Ok(caller) => caller,
        Err(r) => return r,
    };
    let id = eq_filter(&params, "id").and_then(|v| v.parse::<i64>().ok());
    let owner = eq_filter(&params, "user_id");
    let mut inner = fake.inner.lock().unwrap();
    let row = inner.stories.iter_mut().find(|row| {
        row["id"].as_i64() == id
            && row["user_id"] == json!(caller)
            && owner.as_deref() == row["user_id"].as_str()
    });
    match row {
        Some(row) => {
            for field in ["title", "content", "mood"] {
                row[field] = body[field].clone();
            }
            Json(row.clone()).into_response()
        }
        None => table_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        ),
    }
}

async fn delete_story(
    State(fake): State<FakeSupabase>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let caller = match enter(&fake, "DELETE /rest/v1/stories", &headers) {
        Ok(caller) => caller,
        Err(r) => return r,
    };
    let id = eq_filter(&params, "id").and_then(|v| v.parse::<i64>().ok());
    let mut inner = fake.inner.lock().unwrap();
    inner
        .stories
        .retain(|row| !(row["id"].as_i64() == id && row["user_id"] == json!(caller)));
    StatusCode::NO_CONTENT.into_response()
}
