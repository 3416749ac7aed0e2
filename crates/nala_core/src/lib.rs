pub mod domain;
pub mod ports;

pub use domain::{AuthEvent, Mood, Story, StoryDraft, StoryId, UnknownMood, User};
pub use ports::{
    AuthEventStream, AuthGateway, DismissalStore, PortError, PortResult, StoryGateway,
};
