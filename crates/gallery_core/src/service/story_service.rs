//! Story use-case service.
//!
//! # Invariants
//! - Story text is trimmed and never blank.
//! - Story text is never written to logs.

use crate::identity::Identity;
use crate::model::item::ItemId;
use crate::model::story::{Story, StoryId};
use crate::repo::catalog_repo::RepoError;
use crate::repo::story_repo::StoryRepository;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum StoryServiceError {
    EmptyStory,
    ItemNotFound(ItemId),
    StoryNotFound(StoryId),
    Repo(RepoError),
}

impl Display for StoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStory => write!(f, "story text must not be empty"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::StoryNotFound(id) => write!(f, "story not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            RepoError::StoryNotFound(id) => Self::StoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub struct StoryService<R: StoryRepository> {
    repo: R,
}

impl<R: StoryRepository> StoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Attaches a story to an existing item.
    pub fn add_story(&self, item_id: ItemId, text: &str) -> Result<Story, StoryServiceError> {
        let body = text.trim();
        if body.is_empty() {
            return Err(StoryServiceError::EmptyStory);
        }

        let story = self.repo.create_story(&Story {
            id: Uuid::new_v4(),
            item_id,
            body: body.to_string(),
            likes: 0,
            created_at: 0,
        })?;
        info!(
            "event=story_add module=story status=ok item_id={item_id} story_id={} chars={}",
            story.id,
            story.body.chars().count()
        );
        Ok(story)
    }

    /// Stories of one item, oldest first.
    pub fn list_stories(&self, item_id: ItemId) -> Result<Vec<Story>, StoryServiceError> {
        Ok(self.repo.list_stories(item_id)?)
    }

    /// Likes a story once per user. Returns `false` for a repeated like.
    pub fn like_story(
        &mut self,
        story_id: StoryId,
        identity: &Identity,
    ) -> Result<bool, StoryServiceError> {
        let counted = self.repo.like_story(story_id, identity.user_id())?;
        info!("event=story_like module=story status=ok story_id={story_id} counted={counted}");
        Ok(counted)
    }

    pub fn get_story(&self, story_id: StoryId) -> Result<Story, StoryServiceError> {
        self.repo
            .get_story(story_id)?
            .ok_or(StoryServiceError::StoryNotFound(story_id))
    }
}
