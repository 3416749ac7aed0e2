//! services/journal/src/app/forms.rs
//!
//! Local state of the Auth, Write and Edit forms.
//!
//! Every form follows the same cycle: `begin()` validates and marks the form in
//! flight, the caller talks to the gateway without holding any lock, then
//! `succeed()` or `fail()` settles the form. A second `begin()` while a request is
//! in flight is refused, which is how the form "disables itself".

use nala_core::domain::{Story, StoryDraft, StoryId};
use nala_core::ports::PortError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const SIGN_UP_SUCCESS: &str = "Registration successful! Please check your email for verification.";
pub const MISSING_TITLE: &str = "Please enter a title for your story";
pub const MISSING_CONTENT: &str = "Please write your story content";
pub const SIGN_IN_AGAIN: &str = "Please sign in again to save your story";
pub const PERMISSION_DENIED: &str = "Permission denied. Please contact support.";
pub const SECURITY_POLICY: &str = "Database security error. Please try signing out and back in.";

/// Why a submit did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// Rejected before any network call.
    #[error("{0}")]
    Invalid(&'static str),
    #[error("A request is already in progress")]
    Busy,
    /// The gateway (or the identity re-check) refused the request.
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FormMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl FormMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Error, text: text.into() }
    }
}

/// Turns a gateway failure on insert/update into the text shown in the form.
pub fn save_error_message(err: &PortError, fallback: &str) -> String {
    match err {
        PortError::Gateway { code: Some(code), .. } if code == "42501" => PERMISSION_DENIED.to_string(),
        PortError::Gateway { code: Some(code), .. } if code == "PGRST116" => SECURITY_POLICY.to_string(),
        PortError::Gateway { message, .. } if message.trim().is_empty() => fallback.to_string(),
        PortError::Gateway { message, .. } => message.clone(),
        PortError::Unauthorized => SIGN_IN_AGAIN.to_string(),
        other => other.to_string(),
    }
}

/// Turns an auth failure into inline text; the gateway's wording is kept.
pub fn auth_error_message(err: &PortError) -> String {
    match err {
        PortError::Gateway { message, .. } if !message.trim().is_empty() => message.clone(),
        PortError::Gateway { .. } => "An error occurred".to_string(),
        other => other.to_string(),
    }
}

fn validate_story(draft: &StoryDraft) -> Result<(), &'static str> {
    if draft.title.trim().is_empty() {
        return Err(MISSING_TITLE);
    }
    if draft.content.trim().is_empty() {
        return Err(MISSING_CONTENT);
    }
    Ok(())
}

//=========================================================================================
// Auth Form
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub mode: AuthMode,
    pub in_flight: bool,
    pub message: Option<FormMessage>,
}

/// What an accepted auth submit should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
}

impl AuthForm {
    pub fn set_fields(&mut self, email: &str, password: &str) {
        self.email = email.to_string();
        self.password = password.to_string();
    }

    pub fn toggle_mode(&mut self) -> Result<AuthMode, FormError> {
        if self.in_flight {
            return Err(FormError::Busy);
        }
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.message = None;
        Ok(self.mode)
    }

    pub fn begin(&mut self) -> Result<AuthRequest, FormError> {
        if self.in_flight {
            return Err(FormError::Busy);
        }
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            self.message = Some(FormMessage::error(FILL_ALL_FIELDS));
            return Err(FormError::Invalid(FILL_ALL_FIELDS));
        }
        self.in_flight = true;
        self.message = None;
        Ok(AuthRequest {
            mode: self.mode,
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }

    pub fn succeed(&mut self) {
        self.in_flight = false;
        if self.mode == AuthMode::SignUp {
            self.message = Some(FormMessage::success(SIGN_UP_SUCCESS));
            self.email.clear();
            self.password.clear();
            self.mode = AuthMode::SignIn;
        }
    }

    pub fn fail(&mut self, text: String) {
        self.in_flight = false;
        self.message = Some(FormMessage::error(text));
    }

    /// Drops everything typed so far, e.g. after signing out.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

//=========================================================================================
// Write Form
//=========================================================================================

#[derive(Debug, Default)]
pub struct WriteForm {
    pub draft: StoryDraft,
    pub in_flight: bool,
    pub error: Option<String>,
}

impl WriteForm {
    pub fn set_fields(&mut self, draft: StoryDraft) {
        self.draft = draft;
    }

    /// Validates and returns the trimmed draft to insert.
    pub fn begin(&mut self) -> Result<StoryDraft, FormError> {
        if self.in_flight {
            return Err(FormError::Busy);
        }
        if let Err(text) = validate_story(&self.draft) {
            self.error = Some(text.to_string());
            return Err(FormError::Invalid(text));
        }
        self.in_flight = true;
        self.error = None;
        Ok(self.draft.trimmed())
    }

    pub fn succeed(&mut self) {
        self.reset();
    }

    pub fn fail(&mut self, text: String) {
        self.in_flight = false;
        self.error = Some(text);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

//=========================================================================================
// Edit Form
//=========================================================================================

/// Edit form for one story, seeded from it.
#[derive(Debug)]
pub struct EditForm {
    original: Story,
    pub draft: StoryDraft,
    pub in_flight: bool,
    pub error: Option<String>,
}

impl EditForm {
    pub fn open(story: Story) -> Self {
        Self {
            draft: story.draft(),
            original: story,
            in_flight: false,
            error: None,
        }
    }

    pub fn story_id(&self) -> StoryId {
        self.original.id
    }

    pub fn original(&self) -> &Story {
        &self.original
    }

    pub fn set_fields(&mut self, draft: StoryDraft) {
        self.draft = draft;
    }

    pub fn begin(&mut self) -> Result<StoryDraft, FormError> {
        if self.in_flight {
            return Err(FormError::Busy);
        }
        if let Err(text) = validate_story(&self.draft) {
            self.error = Some(text.to_string());
            return Err(FormError::Invalid(text));
        }
        self.in_flight = true;
        self.error = None;
        Ok(self.draft.trimmed())
    }

    /// Keeps the in-progress values and shows the error inline.
    pub fn fail(&mut self, text: String) {
        self.in_flight = false;
        self.error = Some(text);
    }
}
