//! services/journal/src/testing.rs
//!
//! In-memory stand-ins for the gateway and the dismissal store, used by the unit
//! tests. The fake gateway emulates the hosted service's per-user row scoping and
//! its error payloads, and counts every call so tests can assert that no
//! network round-trip happened.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::stream;
use nala_core::domain::{AuthEvent, Mood, Story, StoryDraft, StoryId, User};
use nala_core::ports::{
    AuthEventStream, AuthGateway, DismissalStore, PortError, PortResult, StoryGateway,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

struct Account {
    password: String,
    user: User,
    confirmed: bool,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, Account>,
    current: Option<User>,
    stories: Vec<Story>,
    public: HashSet<StoryId>,
    next_id: StoryId,
    failures: HashMap<&'static str, PortError>,
    delays: HashMap<&'static str, std::time::Duration>,
    calls: Vec<&'static str>,
}

pub struct FakeGateway {
    state: Mutex<FakeState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(FakeState {
                next_id: 1,
                ..FakeState::default()
            }),
            events,
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn new_user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Self::epoch(),
        }
    }

    /// Registers an account whose email is already verified.
    pub fn register_confirmed(&self, email: &str, password: &str) -> User {
        let user = Self::new_user(email);
        self.state.lock().unwrap().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
                confirmed: true,
            },
        );
        user
    }

    /// Marks a session as already established without emitting an event.
    pub fn force_sign_in(&self, user: &User) {
        self.state.lock().unwrap().current = Some(user.clone());
    }

    /// The gateway forgets the session behind the client's back.
    pub fn expire_session(&self) {
        self.state.lock().unwrap().current = None;
    }

    /// Inserts a story directly, bypassing row scoping. Each seeded story is one
    /// minute newer than the previous one.
    pub fn seed_story(&self, owner: Uuid, title: &str, mood: Mood) -> Story {
        let mut state = self.state.lock().unwrap();
        let story = Self::make_story(&mut state, owner, &StoryDraft::new(title, "seeded", mood));
        state.stories.push(story.clone());
        story
    }

    /// Makes a story visible to every signed-in user.
    pub fn make_public(&self, id: StoryId) {
        self.state.lock().unwrap().public.insert(id);
    }

    /// The next call to `op` fails with `err`.
    pub fn fail_next(&self, op: &'static str, err: PortError) {
        self.state.lock().unwrap().failures.insert(op, err);
    }

    /// The next call to `op` waits `by` before it is served.
    pub fn delay_next(&self, op: &'static str, by: std::time::Duration) {
        self.state.lock().unwrap().delays.insert(op, by);
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn make_story(state: &mut FakeState, owner: Uuid, draft: &StoryDraft) -> Story {
        let id = state.next_id;
        state.next_id += 1;
        Story {
            id,
            user_id: owner,
            title: draft.title.clone(),
            content: draft.content.clone(),
            mood: draft.mood,
            created_at: Self::epoch() + Duration::minutes(id),
        }
    }

    async fn pause(&self, op: &'static str) {
        let delay = self.state.lock().unwrap().delays.remove(op);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Records the call and returns the locked state, or the injected failure.
    fn enter(&self, op: &'static str) -> PortResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        match state.failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn no_rows() -> PortError {
        PortError::gateway(
            Some("PGRST116"),
            "JSON object requested, multiple (or no) rows returned",
        )
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<User> {
        self.pause("sign_up").await;
        let mut state = self.enter("sign_up")?;
        if state.accounts.contains_key(email) {
            return Err(PortError::gateway(Some("user_already_exists"), "User already registered"));
        }
        let user = Self::new_user(email);
        state.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
                confirmed: false,
            },
        );
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<User> {
        self.pause("sign_in").await;
        let user = {
            let mut state = self.enter("sign_in")?;
            let account = state
                .accounts
                .get(email)
                .filter(|a| a.password == password)
                .ok_or_else(|| PortError::gateway(Some("invalid_credentials"), "Invalid login credentials"))?;
            if !account.confirmed {
                return Err(PortError::gateway(Some("email_not_confirmed"), "Email not confirmed"));
            }
            let user = account.user.clone();
            state.current = Some(user.clone());
            user
        };
        self.emit(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        self.pause("sign_out").await;
        self.enter("sign_out")?.current = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_user(&self) -> PortResult<Option<User>> {
        self.pause("current_user").await;
        Ok(self.enter("current_user")?.current.clone())
    }

    fn on_auth_state_change(&self) -> AuthEventStream {
        let receiver = self.events.subscribe();
        Box::pin(stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.ok().map(|event| (event, receiver))
        }))
    }
}

#[async_trait]
impl StoryGateway for FakeGateway {
    async fn list_stories(&self) -> PortResult<Vec<Story>> {
        self.pause("list_stories").await;
        let state = self.enter("list_stories")?;
        let Some(viewer) = state.current.as_ref().map(|u| u.id) else {
            return Ok(Vec::new());
        };
        let mut visible: Vec<Story> = state
            .stories
            .iter()
            .filter(|s| s.user_id == viewer || state.public.contains(&s.id))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    async fn insert_story(&self, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story> {
        self.pause("insert_story").await;
        let mut state = self.enter("insert_story")?;
        if state.current.as_ref().map(|u| u.id) != Some(user_id) {
            return Err(PortError::gateway(
                Some("42501"),
                "new row violates row-level security policy for table \"stories\"",
            ));
        }
        let story = Self::make_story(&mut state, user_id, draft);
        state.stories.push(story.clone());
        Ok(story)
    }

    async fn update_story(&self, id: StoryId, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story> {
        self.pause("update_story").await;
        let mut state = self.enter("update_story")?;
        let viewer = state.current.as_ref().map(|u| u.id);
        let story = state
            .stories
            .iter_mut()
            .find(|s| s.id == id && s.user_id == user_id && Some(s.user_id) == viewer)
            .ok_or_else(Self::no_rows)?;
        story.title = draft.title.clone();
        story.content = draft.content.clone();
        story.mood = draft.mood;
        Ok(story.clone())
    }

    async fn delete_story(&self, id: StoryId) -> PortResult<()> {
        self.pause("delete_story").await;
        let mut state = self.enter("delete_story")?;
        let viewer = state.current.as_ref().map(|u| u.id);
        state
            .stories
            .retain(|s| !(s.id == id && Some(s.user_id) == viewer));
        Ok(())
    }
}

/// Keeps the dismissal timestamp in memory.
#[derive(Default)]
pub struct MemoryDismissalStore {
    dismissed_at: Mutex<Option<DateTime<Utc>>>,
}

#[async_trait]
impl DismissalStore for MemoryDismissalStore {
    async fn load_dismissed_at(&self) -> PortResult<Option<DateTime<Utc>>> {
        Ok(*self.dismissed_at.lock().unwrap())
    }

    async fn save_dismissed_at(&self, at: DateTime<Utc>) -> PortResult<()> {
        *self.dismissed_at.lock().unwrap() = Some(at);
        Ok(())
    }
}
