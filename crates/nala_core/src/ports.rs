//! crates/nala_core/src/ports.rs
//!
//! Defines the service contracts (traits) the journal consumes.
//! The hosted auth/storage gateway and the local dismissal store sit behind these
//! traits, so the client state can be driven by any implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{AuthEvent, Story, StoryDraft, StoryId, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The gateway refused the caller's credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,
    /// The gateway answered with an error payload.
    #[error("{message}")]
    Gateway {
        code: Option<String>,
        message: String,
    },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    pub fn gateway(code: Option<&str>, message: impl Into<String>) -> Self {
        PortError::Gateway {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// The gateway error code, if the gateway supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            PortError::Gateway { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Stream of auth-state notifications. Ends when the gateway is dropped.
pub type AuthEventStream = Pin<Box<dyn Stream<Item = AuthEvent> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Registers a new account. Returns the created user; whether a session is
    /// established depends on the gateway's email verification policy.
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<User>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<User>;

    async fn sign_out(&self) -> PortResult<()>;

    /// Asks the gateway who the current session belongs to, `None` when signed out.
    async fn current_user(&self) -> PortResult<Option<User>>;

    /// Subscribes to auth-state changes. Each call returns an independent stream.
    fn on_auth_state_change(&self) -> AuthEventStream;
}

/// Table operations on `stories`. The gateway scopes every call to the caller's identity.
#[async_trait]
pub trait StoryGateway: Send + Sync {
    /// All visible stories, newest first.
    async fn list_stories(&self) -> PortResult<Vec<Story>>;

    async fn insert_story(&self, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story>;

    /// Replaces title, content and mood of the story `id` owned by `user_id`.
    async fn update_story(
        &self,
        id: StoryId,
        user_id: Uuid,
        draft: &StoryDraft,
    ) -> PortResult<Story>;

    async fn delete_story(&self, id: StoryId) -> PortResult<()>;
}

/// Persists when the install banner was last dismissed.
#[async_trait]
pub trait DismissalStore: Send + Sync {
    async fn load_dismissed_at(&self) -> PortResult<Option<DateTime<Utc>>>;

    async fn save_dismissed_at(&self, at: DateTime<Utc>) -> PortResult<()>;
}
