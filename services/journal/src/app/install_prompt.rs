//! services/journal/src/app/install_prompt.rs
//!
//! The "install this app" banner. Once dismissed it stays hidden for a week.

use chrono::{DateTime, Duration, Utc};
use nala_core::ports::DismissalStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

pub const DISMISS_COOLDOWN_DAYS: i64 = 7;

pub struct InstallPrompt {
    store: Arc<dyn DismissalStore>,
    dismissed_at: RwLock<Option<DateTime<Utc>>>,
}

impl InstallPrompt {
    pub fn new(store: Arc<dyn DismissalStore>) -> Self {
        Self {
            store,
            dismissed_at: RwLock::new(None),
        }
    }

    /// Reads the persisted dismissal. An unreadable record shows the banner again.
    pub async fn load(&self) {
        match self.store.load_dismissed_at().await {
            Ok(at) => *self.dismissed_at.write().await = at,
            Err(e) => warn!("Could not read install prompt dismissal: {}", e),
        }
    }

    pub async fn is_visible(&self, now: DateTime<Utc>) -> bool {
        match *self.dismissed_at.read().await {
            Some(at) => now - at >= Duration::days(DISMISS_COOLDOWN_DAYS),
            None => true,
        }
    }

    /// Hides the banner right away; persisting is best effort.
    pub async fn dismiss(&self, now: DateTime<Utc>) {
        *self.dismissed_at.write().await = Some(now);
        if let Err(e) = self.store.save_dismissed_at(now).await {
            error!("Could not persist install prompt dismissal: {}", e);
        }
    }
}
