//! Item stories.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StoryId = Uuid;

/// Free-text story attached to a gallery item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub item_id: ItemId,
    pub body: String,
    pub likes: u64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}
