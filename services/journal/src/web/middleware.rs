//! services/journal/src/web/middleware.rs
//!
//! Session gate for the pages that need a signed-in user.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Middleware that lets the request through only while a session is held.
///
/// If signed in, inserts the current `User` into request extensions for handlers to use.
/// Otherwise answers 401 Unauthorized with the rendered view, which is the Auth page.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(user) = state.app.current_user().await else {
        debug!("Rejected {} {}: no session", req.method(), req.uri().path());
        return (StatusCode::UNAUTHORIZED, Json(state.app.render().await)).into_response();
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}
