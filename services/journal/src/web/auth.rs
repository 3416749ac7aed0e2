//! services/journal/src/web/auth.rs
//!
//! Auth page endpoints: submit the sign-in/sign-up form, switch its mode, sign out.

use axum::{extract::State, http::StatusCode, Extension, Json};
use nala_core::domain::User;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::app::forms::FormError;
use crate::app::view::AppView;
use crate::web::rest::{action_status, form_status};
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth - Sign in or sign up, depending on the form's mode
#[utoipa::path(
    post,
    path = "/auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Request accepted; a sign-in lands through the session subscription", body = AppView),
        (status = 401, description = "The gateway rejected the credentials", body = AppView),
        (status = 409, description = "A request is already in flight", body = AppView),
        (status = 422, description = "Email or password missing", body = AppView)
    )
)]
pub async fn submit_auth_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> (StatusCode, Json<AppView>) {
    let status = match state.app.submit_auth(&req.email, &req.password).await {
        Ok(()) => StatusCode::OK,
        Err(FormError::Failed(message)) => {
            warn!("Auth rejected for {}: {}", req.email.trim(), message);
            StatusCode::UNAUTHORIZED
        }
        Err(e) => form_status(&e),
    };
    (status, Json(state.app.render().await))
}

/// POST /auth/mode - Switch between sign-in and sign-up
#[utoipa::path(
    post,
    path = "/auth/mode",
    responses(
        (status = 200, description = "Mode switched", body = AppView),
        (status = 409, description = "A request is already in flight", body = AppView)
    )
)]
pub async fn toggle_mode_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<AppView>) {
    let status = match state.app.toggle_auth_mode().await {
        Ok(_) => StatusCode::OK,
        Err(e) => form_status(&e),
    };
    (status, Json(state.app.render().await))
}

/// POST /signout - End the session
#[utoipa::path(
    post,
    path = "/signout",
    responses(
        (status = 200, description = "Sign-out requested", body = AppView),
        (status = 401, description = "No active session", body = AppView),
        (status = 502, description = "The gateway refused; the alert carries the message", body = AppView)
    )
)]
pub async fn sign_out_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> (StatusCode, Json<AppView>) {
    let status = match state.app.sign_out().await {
        Ok(()) => {
            info!("Sign-out requested by {}", user.email);
            StatusCode::OK
        }
        Err(e) => action_status(&e),
    };
    (status, Json(state.app.render().await))
}
