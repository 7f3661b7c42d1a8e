//! Gallery item model.
//!
//! # Invariants
//! - `id` is stable and never reused for another artwork.
//! - `likes` only ever grows.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable numeric identifier of a gallery artwork.
pub type ItemId = i64;

/// One artwork in the fixed gallery collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Primary archetype name, fixed at creation.
    #[serde(default)]
    pub archetype: Option<String>,
    /// Explicit thumbnail filename relative to the thumbnail root.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub likes: u64,
}

/// Validation errors for item records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    NegativeId(ItemId),
    BlankImage(ItemId),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeId(id) => write!(f, "item id must be non-negative, got {id}"),
            Self::BlankImage(id) => write!(f, "item {id} has a blank image filename"),
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    pub fn new(id: ItemId, archetype: Option<String>) -> Self {
        Self {
            id,
            archetype,
            image: None,
            likes: 0,
        }
    }

    /// Primary archetype with blank values treated as absent.
    pub fn primary_archetype(&self) -> Option<&str> {
        self.archetype
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Returns true when `name` names this item's primary archetype.
    pub fn is_primary_archetype(&self, name: &str) -> bool {
        self.primary_archetype()
            .is_some_and(|primary| primary.eq_ignore_ascii_case(name.trim()))
    }

    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id < 0 {
            return Err(ItemValidationError::NegativeId(self.id));
        }
        if self
            .image
            .as_deref()
            .is_some_and(|image| image.trim().is_empty())
        {
            return Err(ItemValidationError::BlankImage(self.id));
        }
        Ok(())
    }
}
