//! services/journal/src/web/state.rs
//!
//! Defines the state shared by every HTTP handler.

use crate::app::JournalApp;
use crate::config::Config;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// The process serves a single page session, so there is exactly one `JournalApp`.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<JournalApp>,
    pub config: Arc<Config>,
}
