//! services/journal/src/web/rest.rs
//!
//! Contains the Axum handlers for the page events of the journal and the master
//! definition for the OpenAPI specification. Every handler answers with the
//! freshly rendered view.

use crate::app::forms::{AuthMode, FormError, FormMessage, MessageKind};
use crate::app::router::{Page, Screen};
use crate::app::view::{
    AppView, AuthView, DeletePromptView, DraftView, EditView, InstallPromptView, MoodOption,
    NavbarView, StoryCardView, TimelineView, WriteView,
};
use crate::app::ActionError;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use nala_core::domain::{Mood, StoryDraft, StoryId, User};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        view_handler,
        moods_handler,
        crate::web::auth::submit_auth_handler,
        crate::web::auth::toggle_mode_handler,
        crate::web::auth::sign_out_handler,
        navigate_handler,
        write_handler,
        cancel_write_handler,
        open_edit_handler,
        update_story_handler,
        cancel_edit_handler,
        request_delete_handler,
        confirm_delete_handler,
        dismiss_alert_handler,
        dismiss_install_prompt_handler,
    ),
    components(
        schemas(
            AppView, Screen, Page, NavbarView, AuthView, AuthMode, FormMessage, MessageKind,
            TimelineView, StoryCardView, EditView, DraftView, DeletePromptView, WriteView,
            MoodOption, InstallPromptView, StoryForm, NavigateRequest, ConfirmDeleteRequest,
            crate::web::auth::AuthRequest,
        )
    ),
    tags(
        (name = "NALA Journal", description = "Page events and rendered views of the journal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

/// The fields of the Write and Edit forms.
#[derive(Deserialize, ToSchema)]
pub struct StoryForm {
    pub title: String,
    pub content: String,
    /// Stored mood value (`"😊 Happy"`) or bare label; defaults to Happy.
    #[serde(default)]
    pub mood: Option<String>,
}

impl StoryForm {
    fn into_draft(self) -> Result<StoryDraft, (StatusCode, String)> {
        let mood = match self.mood.as_deref() {
            Some(raw) => raw
                .parse::<Mood>()
                .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?,
            None => Mood::default(),
        };
        Ok(StoryDraft::new(self.title, self.content, mood))
    }
}

#[derive(Deserialize, ToSchema)]
pub struct NavigateRequest {
    pub page: Page,
}

#[derive(Deserialize, ToSchema)]
pub struct ConfirmDeleteRequest {
    pub confirmed: bool,
}

type ViewResponse = (StatusCode, Json<AppView>);

//=========================================================================================
// Status Mapping
//=========================================================================================

pub(crate) fn form_status(err: &FormError) -> StatusCode {
    match err {
        FormError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FormError::Busy => StatusCode::CONFLICT,
        FormError::Failed(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn action_status(err: &ActionError) -> StatusCode {
    match err {
        ActionError::NotSignedIn => StatusCode::UNAUTHORIZED,
        ActionError::StoryNotFound(_) => StatusCode::NOT_FOUND,
        ActionError::NotOwner => StatusCode::FORBIDDEN,
        ActionError::NoPendingDelete(_) | ActionError::NotEditing(_) => StatusCode::CONFLICT,
        ActionError::Form(e) => form_status(e),
        ActionError::Alert(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn rendered(state: &AppState, status: StatusCode) -> ViewResponse {
    (status, Json(state.app.render().await))
}

//=========================================================================================
// Public Handlers
//=========================================================================================

/// The current view: loading, auth page, timeline or write page.
#[utoipa::path(
    get,
    path = "/view",
    responses((status = 200, description = "The rendered view", body = AppView))
)]
pub async fn view_handler(State(state): State<Arc<AppState>>) -> ViewResponse {
    rendered(&state, StatusCode::OK).await
}

/// The moods a story can be tagged with, in picker order.
#[utoipa::path(
    get,
    path = "/moods",
    responses((status = 200, description = "All moods", body = [MoodOption]))
)]
pub async fn moods_handler() -> Json<Vec<MoodOption>> {
    Json(MoodOption::all())
}

/// Closes the blocking alert.
#[utoipa::path(
    post,
    path = "/alert/dismiss",
    responses((status = 200, description = "Alert closed", body = AppView))
)]
pub async fn dismiss_alert_handler(State(state): State<Arc<AppState>>) -> ViewResponse {
    state.app.dismiss_alert().await;
    rendered(&state, StatusCode::OK).await
}

/// Hides the install banner for the next seven days.
#[utoipa::path(
    post,
    path = "/install-prompt/dismiss",
    responses((status = 200, description = "Banner hidden", body = AppView))
)]
pub async fn dismiss_install_prompt_handler(State(state): State<Arc<AppState>>) -> ViewResponse {
    state.app.dismiss_install_prompt().await;
    rendered(&state, StatusCode::OK).await
}

//=========================================================================================
// Session-Gated Handlers
//=========================================================================================

/// Switches between the Timeline and Write pages.
#[utoipa::path(
    post,
    path = "/navigate",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Page switched", body = AppView),
        (status = 401, description = "No active session", body = AppView)
    )
)]
pub async fn navigate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NavigateRequest>,
) -> ViewResponse {
    state.app.navigate(req.page).await;
    rendered(&state, StatusCode::OK).await
}

/// Submits the Write form.
#[utoipa::path(
    post,
    path = "/write",
    request_body = StoryForm,
    responses(
        (status = 201, description = "Story saved; the timeline shows it first", body = AppView),
        (status = 401, description = "No active session", body = AppView),
        (status = 409, description = "A save is already in flight", body = AppView),
        (status = 422, description = "Title or content missing", body = AppView),
        (status = 502, description = "The gateway refused; the form carries the message", body = AppView)
    )
)]
pub async fn write_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(form): Json<StoryForm>,
) -> Result<ViewResponse, (StatusCode, String)> {
    let draft = form.into_draft()?;
    let status = match state.app.submit_write(draft).await {
        Ok(story) => {
            info!("{} wrote story {}", user.email, story.id);
            StatusCode::CREATED
        }
        Err(e) => {
            debug!("Write rejected: {}", e);
            form_status(&e)
        }
    };
    Ok(rendered(&state, status).await)
}

/// Leaves the Write page, discarding the draft.
#[utoipa::path(
    post,
    path = "/write/cancel",
    responses((status = 200, description = "Back on the timeline", body = AppView))
)]
pub async fn cancel_write_handler(State(state): State<Arc<AppState>>) -> ViewResponse {
    state.app.cancel_write().await;
    rendered(&state, StatusCode::OK).await
}

/// Opens the edit form for one of the user's own stories.
#[utoipa::path(
    post,
    path = "/stories/{id}/edit",
    params(("id" = i64, Path, description = "Story id")),
    responses(
        (status = 200, description = "Edit form open", body = AppView),
        (status = 403, description = "Not the author", body = AppView),
        (status = 404, description = "No such story on the timeline", body = AppView)
    )
)]
pub async fn open_edit_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StoryId>,
) -> ViewResponse {
    let status = match state.app.open_edit(id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Cannot edit story {}: {}", id, e);
            action_status(&e)
        }
    };
    rendered(&state, status).await
}

/// Submits the edit form for the story it was opened for.
#[utoipa::path(
    put,
    path = "/stories/{id}",
    params(("id" = i64, Path, description = "Story id")),
    request_body = StoryForm,
    responses(
        (status = 200, description = "Story updated and timeline refreshed", body = AppView),
        (status = 409, description = "The edit form is not open for this story", body = AppView),
        (status = 422, description = "Title or content missing", body = AppView),
        (status = 502, description = "The gateway refused; the form carries the message", body = AppView)
    )
)]
pub async fn update_story_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StoryId>,
    Json(form): Json<StoryForm>,
) -> Result<ViewResponse, (StatusCode, String)> {
    let draft = form.into_draft()?;
    let status = match state.app.submit_edit(id, draft).await {
        Ok(_) => StatusCode::OK,
        Err(e) => action_status(&e),
    };
    Ok(rendered(&state, status).await)
}

/// Closes the edit form without saving.
#[utoipa::path(
    post,
    path = "/edit/cancel",
    responses((status = 200, description = "Edit form closed", body = AppView))
)]
pub async fn cancel_edit_handler(State(state): State<Arc<AppState>>) -> ViewResponse {
    state.app.cancel_edit().await;
    rendered(&state, StatusCode::OK).await
}

/// First step of a delete: the view comes back with the confirmation question.
#[utoipa::path(
    delete,
    path = "/stories/{id}",
    params(("id" = i64, Path, description = "Story id")),
    responses(
        (status = 202, description = "Awaiting confirmation", body = AppView),
        (status = 403, description = "Not the author", body = AppView),
        (status = 404, description = "No such story on the timeline", body = AppView)
    )
)]
pub async fn request_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StoryId>,
) -> ViewResponse {
    let status = match state.app.request_delete(id).await {
        Ok(_) => StatusCode::ACCEPTED,
        Err(e) => action_status(&e),
    };
    rendered(&state, status).await
}

/// Second step of a delete: the user's answer to the confirmation question.
#[utoipa::path(
    post,
    path = "/stories/{id}/delete",
    params(("id" = i64, Path, description = "Story id")),
    request_body = ConfirmDeleteRequest,
    responses(
        (status = 200, description = "Deleted, or kept when declined", body = AppView),
        (status = 409, description = "No delete pending for this story", body = AppView),
        (status = 502, description = "The gateway refused; the alert carries the message", body = AppView)
    )
)]
pub async fn confirm_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StoryId>,
    Json(req): Json<ConfirmDeleteRequest>,
) -> ViewResponse {
    let status = match state.app.confirm_delete(id, req.confirmed).await {
        Ok(_) => StatusCode::OK,
        Err(e) => action_status(&e),
    };
    rendered(&state, status).await
}
