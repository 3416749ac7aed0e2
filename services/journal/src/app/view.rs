//! services/journal/src/app/view.rs
//!
//! Presentational view models. Markup and styling live outside this crate; these
//! structs carry exactly what each page shows, serialized as JSON.

use chrono::{DateTime, TimeZone, Utc};
use nala_core::domain::{Mood, Story, StoryDraft, StoryId, User};
use serde::Serialize;
use std::fmt::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use super::forms::{AuthForm, AuthMode, EditForm, FormMessage, WriteForm};
use super::router::{Page, Screen};

pub const APP_NAME: &str = "NALA";

//=========================================================================================
// Date Formatting
//=========================================================================================

/// `January 2, 2024 at 03:04 PM`
pub fn format_story_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%B %-d, %Y at %I:%M %p").to_string()
}

/// `January 2, 2024`
pub fn format_long_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%B %-d, %Y").to_string()
}

/// `Jan 2, 2024`
pub fn format_short_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%b %-d, %Y").to_string()
}

//=========================================================================================
// View Models
//=========================================================================================

/// Everything the shell needs to draw the current state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppView {
    pub screen: Screen,
    pub navbar: Option<NavbarView>,
    pub auth: Option<AuthView>,
    pub timeline: Option<TimelineView>,
    pub write: Option<WriteView>,
    /// Blocking alert text, shown until dismissed.
    pub alert: Option<String>,
    pub install_prompt: Option<InstallPromptView>,
}

impl AppView {
    pub fn loading() -> Self {
        Self {
            screen: Screen::Loading,
            navbar: None,
            auth: None,
            timeline: None,
            write: None,
            alert: None,
            install_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavbarView {
    pub brand: String,
    pub greeting: String,
    pub email: String,
    pub current_page: Page,
}

impl NavbarView {
    pub fn new(user: &User, current_page: Page) -> Self {
        Self {
            brand: APP_NAME.to_string(),
            greeting: format!("Hello, {}", user.first_name()),
            email: user.email.clone(),
            current_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthView {
    pub mode: AuthMode,
    pub email: String,
    pub message: Option<FormMessage>,
    pub in_flight: bool,
    pub submit_label: String,
    pub switch_label: String,
}

impl AuthView {
    pub fn new(form: &AuthForm) -> Self {
        let (submit, switch) = match form.mode {
            AuthMode::SignIn => ("Sign In", "Don't have an account? Sign up"),
            AuthMode::SignUp => ("Sign Up", "Already have an account? Sign in"),
        };
        Self {
            mode: form.mode,
            email: form.email.clone(),
            message: form.message.clone(),
            in_flight: form.in_flight,
            submit_label: if form.in_flight { "Loading...".to_string() } else { submit.to_string() },
            switch_label: switch.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoryCardView {
    pub id: StoryId,
    pub title: String,
    pub content: String,
    pub mood: String,
    pub created_at: DateTime<Utc>,
    pub created_label: String,
    /// Edit and delete controls are only offered to the author.
    pub can_edit: bool,
    pub can_delete: bool,
}

impl StoryCardView {
    pub fn new(story: &Story, viewer: Option<Uuid>) -> Self {
        let owned = viewer.is_some_and(|id| story.is_owned_by(id));
        Self {
            id: story.id,
            title: story.title.clone(),
            content: story.content.clone(),
            mood: story.mood.value(),
            created_at: story.created_at,
            created_label: format_story_date(&story.created_at.with_timezone(&chrono::Local)),
            can_edit: owned,
            can_delete: owned,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DraftView {
    pub title: String,
    pub content: String,
    pub mood: String,
}

impl From<&StoryDraft> for DraftView {
    fn from(draft: &StoryDraft) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content.clone(),
            mood: draft.mood.value(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EditView {
    pub story_id: StoryId,
    pub draft: DraftView,
    pub created_label: String,
    pub error: Option<String>,
    pub in_flight: bool,
    pub submit_label: String,
}

impl EditView {
    pub fn new(form: &EditForm) -> Self {
        let created = form.original().created_at.with_timezone(&chrono::Local);
        Self {
            story_id: form.story_id(),
            draft: DraftView::from(&form.draft),
            created_label: format!("Created: {}", format_short_date(&created)),
            error: form.error.clone(),
            in_flight: form.in_flight,
            submit_label: if form.in_flight { "Updating..." } else { "Update Story" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletePromptView {
    pub story_id: StoryId,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimelineView {
    pub heading: String,
    pub subheading: String,
    pub stories: Vec<StoryCardView>,
    /// Shown instead of the list when there are no stories.
    pub empty_message: Option<String>,
    pub editing: Option<EditView>,
    pub pending_delete: Option<DeletePromptView>,
}

impl TimelineView {
    pub fn new(
        stories: &[Story],
        viewer: Option<Uuid>,
        editing: Option<EditView>,
        pending_delete: Option<DeletePromptView>,
    ) -> Self {
        Self {
            heading: "Your Journal Timeline".to_string(),
            subheading: "Reflect on your journey through your stories".to_string(),
            stories: stories.iter().map(|s| StoryCardView::new(s, viewer)).collect(),
            empty_message: stories.is_empty().then(|| "No stories yet".to_string()),
            editing,
            pending_delete,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WriteView {
    pub heading: String,
    pub today: String,
    pub draft: DraftView,
    pub moods: Vec<MoodOption>,
    pub error: Option<String>,
    pub in_flight: bool,
    pub submit_label: String,
}

impl WriteView {
    pub fn new(form: &WriteForm, today: &DateTime<chrono::Local>) -> Self {
        Self {
            heading: "Write Your Story".to_string(),
            today: format_long_date(today),
            draft: DraftView::from(&form.draft),
            moods: MoodOption::all(),
            error: form.error.clone(),
            in_flight: form.in_flight,
            submit_label: if form.in_flight { "Saving..." } else { "Save Story" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MoodOption {
    pub value: String,
    pub emoji: String,
    pub label: String,
}

impl MoodOption {
    pub fn all() -> Vec<Self> {
        Mood::ALL
            .into_iter()
            .map(|mood| Self {
                value: mood.value(),
                emoji: mood.emoji().to_string(),
                label: mood.label().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstallPromptView {
    pub title: String,
    pub description: String,
}

impl Default for InstallPromptView {
    fn default() -> Self {
        Self {
            title: format!("Install {} App", APP_NAME),
            description: "Get the full app experience".to_string(),
        }
    }
}
