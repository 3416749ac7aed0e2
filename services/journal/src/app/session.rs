//! services/journal/src/app/session.rs
//!
//! The process-wide holder of the signed-in identity, and the handle that keeps
//! the auth-change listener alive.

use nala_core::domain::User;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Holds the current user. Starts out loading until the first session check or
/// auth event settles it.
#[derive(Debug)]
pub struct SessionStore {
    user: RwLock<Option<User>>,
    loading: RwLock<bool>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            user: RwLock::new(None),
            loading: RwLock::new(true),
        }
    }

    pub async fn current(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub async fn user_id(&self) -> Option<Uuid> {
        self.user.read().await.as_ref().map(|u| u.id)
    }

    /// Replaces the held user. Setting the same user twice is a no-op.
    pub async fn set(&self, user: Option<User>) {
        *self.user.write().await = user;
    }

    pub async fn is_loading(&self) -> bool {
        *self.loading.read().await
    }

    pub async fn finish_loading(&self) {
        *self.loading.write().await = false;
    }
}

/// Keeps an auth-change listener running. Dropping it, or calling
/// [`Subscription::unsubscribe`], stops the listener.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn unsubscribe(self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
