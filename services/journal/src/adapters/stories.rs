//! services/journal/src/adapters/stories.rs
//!
//! This module contains the adapter for the gateway's `stories` table. It is the
//! concrete implementation of the `StoryGateway` port and speaks the gateway's
//! REST dialect (filters as `column=eq.value` query parameters).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nala_core::domain::{Mood, Story, StoryDraft, StoryId};
use nala_core::ports::{PortError, PortResult, StoryGateway};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::supabase::{decode, decode_error, transport, SupabaseClient};

const TABLE: &str = "stories";
/// Makes the gateway answer with a single object and fail with `PGRST116`
/// when no row is visible.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

//=========================================================================================
// "Impure" Gateway Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
struct StoryRecord {
    id: i64,
    user_id: Uuid,
    title: String,
    content: String,
    mood: String,
    created_at: DateTime<Utc>,
}
impl StoryRecord {
    fn to_domain(self) -> PortResult<Story> {
        let mood = self
            .mood
            .parse::<Mood>()
            .map_err(|e| PortError::Unexpected(format!("Story {}: {}", self.id, e)))?;
        Ok(Story {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            mood,
            created_at: self.created_at,
        })
    }
}

#[derive(Serialize)]
struct NewStoryRecord<'a> {
    user_id: Uuid,
    title: &'a str,
    content: &'a str,
    mood: String,
}

#[derive(Serialize)]
struct StoryChanges<'a> {
    title: &'a str,
    content: &'a str,
    mood: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A table adapter that implements the `StoryGateway` port.
#[derive(Clone)]
pub struct SupabaseStoriesAdapter {
    client: SupabaseClient,
}

impl SupabaseStoriesAdapter {
    /// Creates a new `SupabaseStoriesAdapter` sharing the given client's session.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn request(&self, method: Method) -> PortResult<RequestBuilder> {
        let token = self.client.access_token().await?;
        Ok(self
            .client
            .request(method, &self.client.rest_url(TABLE), token.as_deref()))
    }
}

//=========================================================================================
// `StoryGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryGateway for SupabaseStoriesAdapter {
    async fn list_stories(&self) -> PortResult<Vec<Story>> {
        let response = self
            .request(Method::GET)
            .await?
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(transport)?;

        // Rows that fail to decode are skipped, not fatal to the list.
        let stories = decode::<Vec<StoryRecord>>(response)
            .await?
            .into_iter()
            .filter_map(|record| match record.to_domain() {
                Ok(story) => Some(story),
                Err(e) => {
                    warn!("Skipping unreadable story: {}", e);
                    None
                }
            })
            .collect();
        Ok(stories)
    }

    async fn insert_story(&self, user_id: Uuid, draft: &StoryDraft) -> PortResult<Story> {
        let body = NewStoryRecord {
            user_id,
            title: &draft.title,
            content: &draft.content,
            mood: draft.mood.value(),
        };
        let response = self
            .request(Method::POST)
            .await?
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        decode::<StoryRecord>(response).await?.to_domain()
    }

    async fn update_story(
        &self,
        id: StoryId,
        user_id: Uuid,
        draft: &StoryDraft,
    ) -> PortResult<Story> {
        let body = StoryChanges {
            title: &draft.title,
            content: &draft.content,
            mood: draft.mood.value(),
        };
        let response = self
            .request(Method::PATCH)
            .await?
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        decode::<StoryRecord>(response).await?.to_domain()
    }

    async fn delete_story(&self, id: StoryId) -> PortResult<()> {
        let response = self
            .request(Method::DELETE)
            .await?
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }
        Ok(())
    }
}
