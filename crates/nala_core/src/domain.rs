//! crates/nala_core/src/domain.rs
//!
//! Defines the pure, core data structures for the journal.
//! These structs are independent of the gateway and of any serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Primary key of a story, assigned by the gateway.
pub type StoryId = i64;

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub id: StoryId,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// True when `user_id` owns this story and may edit or delete it.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// The writable part of the story, used to seed the edit form.
    pub fn draft(&self) -> StoryDraft {
        StoryDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            mood: self.mood,
        }
    }
}

/// The fields a user writes. Inserts and updates always send all three.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoryDraft {
    pub title: String,
    pub content: String,
    pub mood: Mood,
}

impl StoryDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, mood: Mood) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            mood,
        }
    }

    /// Returns a copy with surrounding whitespace removed from title and content.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            mood: self.mood,
        }
    }
}

// Represents the signed-in user - sourced entirely from the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The part of the email before `@`, used as a greeting name.
    pub fn first_name(&self) -> &str {
        self.email.split('@').next().unwrap_or_default()
    }
}

/// Notifications emitted by the gateway whenever its auth state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    TokenRefreshed(User),
    SignedOut,
}

impl AuthEvent {
    /// The user carried by the event, `None` for a sign-out.
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthEvent::SignedIn(user) | AuthEvent::TokenRefreshed(user) => Some(user),
            AuthEvent::SignedOut => None,
        }
    }
}

//=========================================================================================
// Mood
//=========================================================================================

/// The fixed list of moods a story can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mood {
    #[default]
    Happy,
    Sad,
    Neutral,
    Excited,
    Thoughtful,
    Tired,
    Motivated,
    Relaxed,
}

impl Mood {
    /// Every mood, in the order the pickers list them.
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Neutral,
        Mood::Excited,
        Mood::Thoughtful,
        Mood::Tired,
        Mood::Motivated,
        Mood::Relaxed,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😢",
            Mood::Neutral => "😐",
            Mood::Excited => "😍",
            Mood::Thoughtful => "🤔",
            Mood::Tired => "😴",
            Mood::Motivated => "🚀",
            Mood::Relaxed => "☕",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Neutral => "Neutral",
            Mood::Excited => "Excited",
            Mood::Thoughtful => "Thoughtful",
            Mood::Tired => "Tired",
            Mood::Motivated => "Motivated",
            Mood::Relaxed => "Relaxed",
        }
    }

    /// The stored value, e.g. `"😊 Happy"`.
    pub fn value(self) -> String {
        format!("{} {}", self.emoji(), self.label())
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mood: {0}")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    /// Accepts the stored value (`"😊 Happy"`) or the bare label (`"Happy"`, any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.value() == s || mood.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}
