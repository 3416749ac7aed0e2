//! services/journal/src/app/router.rs
//!
//! Single-flag page selection. There is no URL routing and no history stack.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// The top-level pages a signed-in user can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Timeline,
    Write,
}

/// What is actually on screen once the auth gate has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Loading,
    Auth,
    Timeline,
    Write,
}

#[derive(Debug, Default)]
pub struct ViewRouter {
    page: RwLock<Page>,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Page {
        *self.page.read().await
    }

    pub async fn navigate(&self, page: Page) {
        *self.page.write().await = page;
    }
}

/// Applies the auth gate: loading first, then sign-in, then the selected page.
pub fn resolve_screen(page: Page, loading: bool, signed_in: bool) -> Screen {
    match (loading, signed_in, page) {
        (true, _, _) => Screen::Loading,
        (false, false, _) => Screen::Auth,
        (false, true, Page::Timeline) => Screen::Timeline,
        (false, true, Page::Write) => Screen::Write,
    }
}
