//! services/journal/src/adapters/supabase.rs
//!
//! The HTTP client shared by the Supabase adapters. It owns the gateway base URL,
//! the project's anon key, the current auth session and the auth-event channel,
//! so the auth adapter and the table adapter see the same identity.

use chrono::{DateTime, Duration, Utc};
use futures::stream;
use nala_core::domain::{AuthEvent, User};
use nala_core::ports::{AuthEventStream, PortError, PortResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Access tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 30;
const EVENT_CAPACITY: usize = 16;

//=========================================================================================
// Session Held by the Client
//=========================================================================================

/// The tokens issued by the gateway for the signed-in user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl AuthSession {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) <= now
    }
}

//=========================================================================================
// "Impure" Gateway Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct UserRecord {
    id: Uuid,
    email: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    pub(crate) fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionRecord {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: UserRecord,
}
impl SessionRecord {
    pub(crate) fn to_domain(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.to_domain(),
        }
    }
}

/// Error payload in either the auth (`msg`/`error_description`) or the table
/// (`code`/`message`) flavour.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_port_error(self, status: StatusCode) -> PortError {
        let code = self
            .error_code
            .or_else(|| match self.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            })
            .or(self.error.clone());
        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        PortError::Gateway { code, message }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

//=========================================================================================
// The Shared Client
//=========================================================================================

/// Cheap to clone; all clones share one session and one event channel.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<AuthSession>>>,
    /// Held for the whole of a refresh so a rotated refresh token is spent once.
    refresh_lock: Arc<Mutex<()>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    /// Creates a client for the project at `base_url` (e.g. `https://xyz.supabase.co`).
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::with_http(Client::new(), base_url, anon_key)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
            events,
        }
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Starts a request carrying the project key and, when given, the user's token.
    pub(crate) fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(self.anon_key.as_str()))
    }

    /// The current session's token, refreshed first when it is about to expire.
    pub(crate) async fn access_token(&self) -> PortResult<Option<String>> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _refreshing = self.refresh_lock.lock().await;
        // Another caller may have refreshed while this one waited.
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }
        let current = self.session.read().await.clone();
        match current {
            Some(session) => Ok(Some(self.refresh(&session.refresh_token).await?.access_token)),
            None => Ok(None),
        }
    }

    /// `Some` when no refresh is needed: no session at all, or a live token.
    async fn fresh_token(&self) -> Option<Option<String>> {
        match self.session.read().await.as_ref() {
            None => Some(None),
            Some(session) if !session.needs_refresh(Utc::now()) => {
                Some(Some(session.access_token.clone()))
            }
            Some(_) => None,
        }
    }

    /// The token of the held session without any refresh attempt.
    pub(crate) async fn held_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> PortResult<AuthSession> {
        debug!("Refreshing gateway access token");
        let response = self
            .request(
                Method::POST,
                &self.auth_url("token?grant_type=refresh_token"),
                None,
            )
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(transport)?;

        match decode::<SessionRecord>(response).await {
            Ok(record) => {
                let session = record.to_domain();
                self.store_session(session.clone()).await;
                self.emit(AuthEvent::TokenRefreshed(session.user.clone()));
                Ok(session)
            }
            Err(e @ (PortError::Gateway { .. } | PortError::Unauthorized)) => {
                warn!("Refresh token rejected, dropping session: {}", e);
                self.clear_session().await;
                self.emit(AuthEvent::SignedOut);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn store_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session);
    }

    pub(crate) async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // No receivers simply means nobody is listening yet.
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> AuthEventStream {
        let receiver = self.events.subscribe();
        Box::pin(stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Auth listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}

//=========================================================================================
// Response Helpers
//=========================================================================================

pub(crate) fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Turns a non-success response into `PortError::Unauthorized` (401) or a
/// `PortError::Gateway` carrying the decoded payload.
pub(crate) async fn decode_error(response: Response) -> PortError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        debug!("Gateway rejected the credentials of {}", response.url().path());
        return PortError::Unauthorized;
    }
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .unwrap_or_default()
        .into_port_error(status)
}

/// Decodes a success body as `T`, or the error payload otherwise.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    if !response.status().is_success() {
        return Err(decode_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Malformed gateway response: {}", e)))
}
