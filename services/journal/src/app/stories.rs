//! services/journal/src/app/stories.rs
//!
//! The client-held list of the signed-in user's stories, newest first.
//! It is replaced wholesale on every fetch and prepended on local creation.

use nala_core::domain::{Story, StoryDraft, StoryId};
use nala_core::ports::{PortResult, StoryGateway};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

pub struct StoryCollection {
    gateway: Arc<dyn StoryGateway>,
    stories: RwLock<Vec<Story>>,
}

impl StoryCollection {
    pub fn new(gateway: Arc<dyn StoryGateway>) -> Self {
        Self {
            gateway,
            stories: RwLock::new(Vec::new()),
        }
    }

    /// Re-reads every visible story. On failure the error is logged and the
    /// previous list stays as it was.
    pub async fn fetch_all(&self) {
        match self.gateway.list_stories().await {
            Ok(stories) => {
                debug!("Fetched {} stories", stories.len());
                *self.stories.write().await = stories;
            }
            Err(e) => error!("Error fetching stories: {}", e),
        }
    }

    /// Inserts a story for `user_id` and prepends the gateway's canonical record.
    pub async fn add(&self, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story> {
        let story = self.gateway.insert_story(user_id, draft).await?;
        self.stories.write().await.insert(0, story.clone());
        Ok(story)
    }

    /// Replaces the story's fields, then reconciles with a full fetch.
    pub async fn update(&self, id: StoryId, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story> {
        let story = self.gateway.update_story(id, user_id, draft).await?;
        self.fetch_all().await;
        Ok(story)
    }

    /// Deletes the story, then reconciles with a full fetch.
    pub async fn remove(&self, id: StoryId) -> PortResult<()> {
        self.gateway.delete_story(id).await?;
        self.fetch_all().await;
        Ok(())
    }

    pub async fn clear(&self) {
        self.stories.write().await.clear();
    }

    pub async fn get(&self, id: StoryId) -> Option<Story> {
        self.stories.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Story> {
        self.stories.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.stories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stories.read().await.is_empty()
    }
}
