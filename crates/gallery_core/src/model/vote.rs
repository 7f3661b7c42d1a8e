//! Archetype vote records and derived tallies.
//!
//! # Invariants
//! - At most one live vote exists per (item, archetype, user).
//! - `VoteTally::total` equals the sum of `user_votes` values at all times.

use crate::model::archetype::ArchetypeId;
use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable user identifier (session id or local temp id).
pub type UserId = String;

/// Persisted vote row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub item_id: ItemId,
    pub archetype_id: ArchetypeId,
    pub user_id: UserId,
    /// Signed value, typically -1, 0 or +1.
    pub value: i32,
}

impl Vote {
    pub fn new(
        item_id: ItemId,
        archetype_id: ArchetypeId,
        user_id: impl Into<UserId>,
        value: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            archetype_id,
            user_id: user_id.into(),
            value,
        }
    }
}

/// Per (item, archetype) running total plus each user's current vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub total: i64,
    pub user_votes: BTreeMap<UserId, i32>,
}

impl VoteTally {
    /// Current vote of `user_id`, `0` when the user never voted.
    pub fn user_vote(&self, user_id: &str) -> i32 {
        self.user_votes.get(user_id).copied().unwrap_or(0)
    }

    /// Replaces the user's vote and shifts the total by the difference.
    ///
    /// Returns the previous value, or `None` when `value` equals it.
    pub fn apply(&mut self, user_id: &str, value: i32) -> Option<i32> {
        let old = self.user_vote(user_id);
        if old == value {
            return None;
        }
        self.user_votes.insert(user_id.to_string(), value);
        self.total += i64::from(value) - i64::from(old);
        Some(old)
    }

    /// Restores a user's previous vote, undoing one `apply`.
    pub(crate) fn revert(&mut self, user_id: &str, previous: i32, had_entry: bool) {
        let current = self.user_vote(user_id);
        self.total += i64::from(previous) - i64::from(current);
        if had_entry {
            self.user_votes.insert(user_id.to_string(), previous);
        } else {
            self.user_votes.remove(user_id);
        }
    }

    /// Sum of the per-user values, independent of the running total.
    pub fn recomputed_total(&self) -> i64 {
        self.user_votes.values().map(|value| i64::from(*value)).sum()
    }
}

/// One entry of an item's secondary archetype set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecondaryArchetype {
    pub archetype_id: ArchetypeId,
    /// Current positive vote total.
    pub weight: i64,
}

/// Secondary archetype joined with its catalog name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedSecondaryArchetype {
    pub archetype_id: ArchetypeId,
    pub name: String,
    pub weight: i64,
}

/// Result of persisting one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWrite {
    Created,
    Updated { old_value: i32 },
    Unchanged,
}
