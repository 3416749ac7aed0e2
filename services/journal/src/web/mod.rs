pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_session;
pub use rest::ApiDoc;

use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the page-event router: public routes for the view and the auth page,
/// session-gated routes for everything that touches stories.
pub fn router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/view", get(rest::view_handler))
        .route("/moods", get(rest::moods_handler))
        .route("/auth", post(auth::submit_auth_handler))
        .route("/auth/mode", post(auth::toggle_mode_handler))
        .route("/alert/dismiss", post(rest::dismiss_alert_handler))
        .route("/install-prompt/dismiss", post(rest::dismiss_install_prompt_handler));

    // Protected routes (session required)
    let protected_routes = Router::new()
        .route("/signout", post(auth::sign_out_handler))
        .route("/navigate", post(rest::navigate_handler))
        .route("/write", post(rest::write_handler))
        .route("/write/cancel", post(rest::cancel_write_handler))
        .route(
            "/stories/{id}",
            put(rest::update_story_handler).delete(rest::request_delete_handler),
        )
        .route("/stories/{id}/edit", post(rest::open_edit_handler))
        .route("/stories/{id}/delete", post(rest::confirm_delete_handler))
        .route("/edit/cancel", post(rest::cancel_edit_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .with_state(state))
}
