//! services/journal/src/adapters/auth.rs
//!
//! The adapter for the gateway's email/password auth endpoints.
//! It implements the `AuthGateway` port from the `core` crate.

use async_trait::async_trait;
use nala_core::domain::{AuthEvent, User};
use nala_core::ports::{AuthEventStream, AuthGateway, PortResult};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::supabase::{decode, decode_error, transport, SessionRecord, SupabaseClient, UserRecord};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Sign-up answers with a full session when verification is off, or just the
/// pending user when the address still has to be confirmed.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionRecord),
    User(UserRecord),
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthGateway` port against Supabase auth.
#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    client: SupabaseClient,
}

impl SupabaseAuthAdapter {
    /// Creates a new `SupabaseAuthAdapter` sharing the given client's session.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

//=========================================================================================
// `AuthGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthGateway for SupabaseAuthAdapter {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<User> {
        let response = self
            .client
            .request(Method::POST, &self.client.auth_url("signup"), None)
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;

        match decode::<SignUpResponse>(response).await? {
            SignUpResponse::Session(record) => {
                let session = record.to_domain();
                let user = session.user.clone();
                self.client.store_session(session).await;
                self.client.emit(AuthEvent::SignedIn(user.clone()));
                info!("Signed up and signed in {}", user.email);
                Ok(user)
            }
            SignUpResponse::User(record) => {
                let user = record.to_domain();
                info!("Signed up {}, awaiting email verification", user.email);
                Ok(user)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<User> {
        let response = self
            .client
            .request(
                Method::POST,
                &self.client.auth_url("token?grant_type=password"),
                None,
            )
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(transport)?;

        let session = decode::<SessionRecord>(response).await?.to_domain();
        let user = session.user.clone();
        self.client.store_session(session).await;
        self.client.emit(AuthEvent::SignedIn(user.clone()));
        info!("Signed in {}", user.email);
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if let Some(token) = self.client.held_token().await {
            let response = self
                .client
                .request(Method::POST, &self.client.auth_url("logout"), Some(token.as_str()))
                .send()
                .await
                .map_err(transport)?;

            let status = response.status();
            // An expired or already revoked token still counts as signed out.
            let already_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !status.is_success() && !already_gone {
                return Err(decode_error(response).await);
            }
            if already_gone {
                warn!("Gateway no longer knew the session ({}), clearing it locally", status);
            }
        }

        self.client.clear_session().await;
        self.client.emit(AuthEvent::SignedOut);
        info!("Signed out");
        Ok(())
    }

    async fn current_user(&self) -> PortResult<Option<User>> {
        let Some(token) = self.client.access_token().await? else {
            return Ok(None);
        };

        let response = self
            .client
            .request(Method::GET, &self.client.auth_url("user"), Some(token.as_str()))
            .send()
            .await
            .map_err(transport)?;

        let record = decode::<UserRecord>(response).await?;
        Ok(Some(record.to_domain()))
    }

    fn on_auth_state_change(&self) -> AuthEventStream {
        self.client.subscribe()
    }
}
