//! services/journal/src/app/mod.rs
//!
//! The client-side state container. `JournalApp` owns the session, the story
//! list, the current page and the local state of every form, and turns UI events
//! into gateway calls. One instance is one page session.

pub mod forms;
pub mod install_prompt;
pub mod router;
pub mod session;
pub mod stories;
pub mod view;

use chrono::{Local, Utc};
use futures::StreamExt;
use nala_core::domain::{AuthEvent, Story, StoryDraft, StoryId, User};
use nala_core::ports::{AuthGateway, DismissalStore, StoryGateway};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use forms::{
    auth_error_message, save_error_message, AuthForm, AuthMode, AuthRequest, EditForm, FormError,
    WriteForm, SIGN_IN_AGAIN,
};
use install_prompt::InstallPrompt;
use router::{resolve_screen, Page, Screen, ViewRouter};
use session::{SessionStore, Subscription};
use stories::StoryCollection;
use view::{
    AppView, AuthView, DeletePromptView, EditView, InstallPromptView, NavbarView, TimelineView,
    WriteView,
};

pub const DELETE_QUESTION: &str = "Are you sure you want to delete this story?";

/// Failures of UI actions outside a form's own validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Please sign in first")]
    NotSignedIn,
    #[error("Story {0} not found")]
    StoryNotFound(StoryId),
    #[error("Only the author can change this story")]
    NotOwner,
    #[error("Story {0} is not awaiting confirmation")]
    NoPendingDelete(StoryId),
    #[error("Story {0} is not open for editing")]
    NotEditing(StoryId),
    #[error(transparent)]
    Form(#[from] FormError),
    /// Reported to the user through the blocking alert.
    #[error("{0}")]
    Alert(String),
}

pub struct JournalApp {
    auth: Arc<dyn AuthGateway>,
    session: SessionStore,
    stories: StoryCollection,
    router: ViewRouter,
    auth_form: Mutex<AuthForm>,
    write_form: Mutex<WriteForm>,
    edit_form: Mutex<Option<EditForm>>,
    pending_delete: Mutex<Option<StoryId>>,
    alert: Mutex<Option<String>>,
    install_prompt: InstallPrompt,
}

impl JournalApp {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        stories: Arc<dyn StoryGateway>,
        dismissals: Arc<dyn DismissalStore>,
    ) -> Self {
        Self {
            auth,
            session: SessionStore::new(),
            stories: StoryCollection::new(stories),
            router: ViewRouter::new(),
            auth_form: Mutex::new(AuthForm::default()),
            write_form: Mutex::new(WriteForm::default()),
            edit_form: Mutex::new(None),
            pending_delete: Mutex::new(None),
            alert: Mutex::new(None),
            install_prompt: InstallPrompt::new(dismissals),
        }
    }

    //=====================================================================================
    // Startup and Session
    //=====================================================================================

    /// Subscribes to auth changes, loads local state and checks for an existing
    /// session. Keep the returned subscription alive for the app's lifetime.
    pub async fn start(self: &Arc<Self>) -> Subscription {
        let subscription = self.on_session_change();
        self.install_prompt.load().await;
        self.check_session().await;
        subscription
    }

    /// Spawns a listener that applies every gateway auth event to this app.
    pub fn on_session_change(self: &Arc<Self>) -> Subscription {
        let token = CancellationToken::new();
        let mut events = self.auth.on_auth_state_change();
        let app = Arc::clone(self);
        let cancelled = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    event = events.next() => match event {
                        Some(event) => app.handle_auth_event(event).await,
                        None => break,
                    },
                }
            }
            debug!("Auth listener stopped");
        });

        Subscription::new(token)
    }

    /// Asks the gateway for the current user and loads their stories.
    pub async fn check_session(&self) {
        match self.auth.current_user().await {
            Ok(Some(user)) => {
                info!("Resuming session for {}", user.email);
                self.stories.fetch_all().await;
                self.session.set(Some(user)).await;
            }
            Ok(None) => debug!("No existing session"),
            Err(e) => error!("Error checking user: {}", e),
        }
        self.session.finish_loading().await;
    }

    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event.user().cloned() {
            Some(user) => {
                debug!("Auth event for {}", user.email);
                // Stories are loaded before the user is published.
                self.stories.fetch_all().await;
                self.session.set(Some(user)).await;
            }
            None => {
                debug!("Auth event: signed out");
                self.session.set(None).await;
                self.stories.clear().await;
                *self.edit_form.lock().await = None;
                *self.pending_delete.lock().await = None;
                self.write_form.lock().await.reset();
                self.router.navigate(Page::Timeline).await;
            }
        }
        self.session.finish_loading().await;
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.current().await
    }

    pub async fn stories(&self) -> Vec<Story> {
        self.stories.snapshot().await
    }

    pub async fn current_page(&self) -> Page {
        self.router.current().await
    }

    /// Fresh identity check against the gateway before a mutation.
    async fn verified_user(&self) -> Result<User, FormError> {
        match self.auth.current_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(FormError::Failed(SIGN_IN_AGAIN.to_string())),
            Err(e) => {
                error!("Identity check failed: {}", e);
                Err(FormError::Failed(SIGN_IN_AGAIN.to_string()))
            }
        }
    }

    /// The signed-in user, provided they own the story `id`.
    async fn owned_story(&self, id: StoryId) -> Result<Story, ActionError> {
        let user_id = self.session.user_id().await.ok_or(ActionError::NotSignedIn)?;
        let story = self.stories.get(id).await.ok_or(ActionError::StoryNotFound(id))?;
        if !story.is_owned_by(user_id) {
            return Err(ActionError::NotOwner);
        }
        Ok(story)
    }

    //=====================================================================================
    // Auth Page
    //=====================================================================================

    pub async fn toggle_auth_mode(&self) -> Result<AuthMode, FormError> {
        self.auth_form.lock().await.toggle_mode()
    }

    /// Signs in or signs up depending on the form's mode. A successful sign-in is
    /// picked up through the auth-change subscription.
    pub async fn submit_auth(self: &Arc<Self>, email: &str, password: &str) -> Result<(), FormError> {
        let request = {
            let mut form = self.auth_form.lock().await;
            form.set_fields(email, password);
            form.begin()?
        };

        let app = Arc::clone(self);
        detached(async move { app.finish_auth(request).await }).await
    }

    async fn finish_auth(&self, request: AuthRequest) -> Result<(), FormError> {
        let result = match request.mode {
            AuthMode::SignIn => self.auth.sign_in(&request.email, &request.password).await,
            AuthMode::SignUp => self.auth.sign_up(&request.email, &request.password).await,
        };

        let mut form = self.auth_form.lock().await;
        match result {
            Ok(_) => {
                form.succeed();
                Ok(())
            }
            Err(e) => {
                let text = auth_error_message(&e);
                form.fail(text.clone());
                Err(FormError::Failed(text))
            }
        }
    }

    /// Asks the gateway to end the session. Local state is cleared by the
    /// subscription; a failure raises the blocking alert.
    pub async fn sign_out(&self) -> Result<(), ActionError> {
        match self.auth.sign_out().await {
            Ok(()) => {
                self.auth_form.lock().await.reset();
                Ok(())
            }
            Err(e) => {
                let text = format!("Error signing out: {}", e);
                *self.alert.lock().await = Some(text.clone());
                Err(ActionError::Alert(text))
            }
        }
    }

    //=====================================================================================
    // Navigation
    //=====================================================================================

    pub async fn navigate(&self, page: Page) {
        self.router.navigate(page).await;
    }

    //=====================================================================================
    // Write Page
    //=====================================================================================

    /// Validates, re-checks the identity, inserts, prepends and returns to the timeline.
    pub async fn submit_write(self: &Arc<Self>, draft: StoryDraft) -> Result<Story, FormError> {
        let draft = {
            let mut form = self.write_form.lock().await;
            form.set_fields(draft);
            form.begin()?
        };

        let app = Arc::clone(self);
        detached(async move { app.finish_write(draft).await }).await
    }

    async fn finish_write(&self, draft: StoryDraft) -> Result<Story, FormError> {
        let result = match self.verified_user().await {
            Ok(user) => self
                .stories
                .add(user.id, &draft)
                .await
                .map_err(|e| FormError::Failed(save_error_message(&e, "Failed to save story"))),
            Err(e) => Err(e),
        };

        let mut form = self.write_form.lock().await;
        match result {
            Ok(story) => {
                form.succeed();
                drop(form);
                info!("Saved story {}", story.id);
                self.router.navigate(Page::Timeline).await;
                Ok(story)
            }
            Err(e) => {
                form.fail(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn cancel_write(&self) {
        self.write_form.lock().await.reset();
        self.router.navigate(Page::Timeline).await;
    }

    //=====================================================================================
    // Edit Flow
    //=====================================================================================

    pub async fn open_edit(&self, id: StoryId) -> Result<(), ActionError> {
        let story = self.owned_story(id).await?;
        *self.edit_form.lock().await = Some(EditForm::open(story));
        Ok(())
    }

    /// Replaces the open story's fields and reconciles the list. On failure the
    /// form stays open with the typed values.
    pub async fn submit_edit(
        self: &Arc<Self>,
        id: StoryId,
        draft: StoryDraft,
    ) -> Result<Story, ActionError> {
        let draft = {
            let mut guard = self.edit_form.lock().await;
            let form = guard
                .as_mut()
                .filter(|f| f.story_id() == id)
                .ok_or(ActionError::NotEditing(id))?;
            form.set_fields(draft);
            form.begin()?
        };

        let app = Arc::clone(self);
        detached(async move { app.finish_edit(id, draft).await }).await
    }

    async fn finish_edit(&self, id: StoryId, draft: StoryDraft) -> Result<Story, ActionError> {
        let result = match self.verified_user().await {
            Ok(user) => self
                .stories
                .update(id, user.id, &draft)
                .await
                .map_err(|e| FormError::Failed(save_error_message(&e, "Failed to update story"))),
            Err(e) => Err(e),
        };

        let mut guard = self.edit_form.lock().await;
        match result {
            Ok(story) => {
                *guard = None;
                info!("Updated story {}", story.id);
                Ok(story)
            }
            Err(e) => {
                if let Some(form) = guard.as_mut().filter(|f| f.story_id() == id) {
                    form.fail(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Closes the form, discarding typed values; reopening seeds it from the story again.
    pub async fn cancel_edit(&self) {
        if let Some(form) = self.edit_form.lock().await.take() {
            debug!("Edit of story {} cancelled", form.story_id());
        }
    }

    //=====================================================================================
    // Delete Flow
    //=====================================================================================

    /// First step of a delete: records the request and returns the question to ask.
    pub async fn request_delete(&self, id: StoryId) -> Result<&'static str, ActionError> {
        self.owned_story(id).await?;
        *self.pending_delete.lock().await = Some(id);
        Ok(DELETE_QUESTION)
    }

    /// Second step of a delete. Declining clears the request without any network
    /// call; returns whether the story was deleted.
    pub async fn confirm_delete(&self, id: StoryId, confirmed: bool) -> Result<bool, ActionError> {
        {
            let mut pending = self.pending_delete.lock().await;
            if *pending != Some(id) {
                return Err(ActionError::NoPendingDelete(id));
            }
            *pending = None;
        }
        if !confirmed {
            debug!("Delete of story {} declined", id);
            return Ok(false);
        }

        let result = match self.verified_user().await {
            Ok(_) => self.stories.remove(id).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                info!("Deleted story {}", id);
                Ok(true)
            }
            Err(message) => {
                let text = format!("Error deleting story: {}", message);
                *self.alert.lock().await = Some(text.clone());
                Err(ActionError::Alert(text))
            }
        }
    }

    //=====================================================================================
    // Alerts and Install Prompt
    //=====================================================================================

    pub async fn dismiss_alert(&self) {
        *self.alert.lock().await = None;
    }

    pub async fn dismiss_install_prompt(&self) {
        self.install_prompt.dismiss(Utc::now()).await;
    }

    //=====================================================================================
    // Rendering
    //=====================================================================================

    pub async fn render(&self) -> AppView {
        let user = self.session.current().await;
        let page = self.router.current().await;
        let screen = resolve_screen(page, self.session.is_loading().await, user.is_some());

        let mut view = AppView::loading();
        view.screen = screen;
        view.alert = self.alert.lock().await.clone();
        if screen == Screen::Loading {
            return view;
        }
        if self.install_prompt.is_visible(Utc::now()).await {
            view.install_prompt = Some(InstallPromptView::default());
        }

        match (screen, user) {
            (Screen::Timeline, Some(user)) => {
                let stories = self.stories.snapshot().await;
                let editing = self.edit_form.lock().await.as_ref().map(EditView::new);
                let pending_delete = (*self.pending_delete.lock().await).map(|story_id| {
                    DeletePromptView {
                        story_id,
                        question: DELETE_QUESTION.to_string(),
                    }
                });
                view.navbar = Some(NavbarView::new(&user, page));
                view.timeline = Some(TimelineView::new(&stories, Some(user.id), editing, pending_delete));
            }
            (Screen::Write, Some(user)) => {
                let form = self.write_form.lock().await;
                view.navbar = Some(NavbarView::new(&user, page));
                view.write = Some(WriteView::new(&form, &Local::now()));
            }
            _ => {
                let form = self.auth_form.lock().await;
                view.auth = Some(AuthView::new(&form));
            }
        }
        view
    }
}

/// Runs a submit on its own task. The gateway call and the form update that
/// follows it complete even when the caller's future is dropped.
async fn detached<T, E, F>(submit: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<FormError> + Send + 'static,
{
    match tokio::spawn(submit).await {
        Ok(result) => result,
        Err(e) => {
            error!("Submit task failed: {}", e);
            Err(FormError::Failed(e.to_string()).into())
        }
    }
}
