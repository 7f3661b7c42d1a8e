//! In-memory archetype vote aggregation.
//!
//! # Responsibility
//! - Hold per-item vote tallies and the derived secondary archetype set.
//! - Apply vote changes incrementally and keep the derived set in step.
//!
//! # Invariants
//! - For every tracked (item, archetype), `total` equals the sum of the
//!   latest value each user cast.
//! - An archetype is in an item's secondary set iff its total is `> 0`.
//! - A negative vote never lands on a total that is already `<= 0`.
//! - The item's primary archetype never receives votes.

use crate::identity::Identity;
use crate::model::archetype::ArchetypeId;
use crate::model::item::ItemId;
use crate::model::vote::{SecondaryArchetype, Vote, VoteTally};
use crate::repo::catalog_repo::RepoError;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Vote casting errors.
#[derive(Debug)]
pub enum VoteError {
    /// Caller is not an authenticated user.
    Unauthorized,
    /// Target is the item's own primary archetype.
    PrimaryArchetype(ArchetypeId),
    ItemNotFound(ItemId),
    ArchetypeNotFound(ArchetypeId),
    /// Store read or write failed. Any optimistic change was rolled back.
    Repo(RepoError),
}

impl Display for VoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "voting requires an authenticated user"),
            Self::PrimaryArchetype(id) => {
                write!(f, "cannot vote on the item's primary archetype: {id}")
            }
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ArchetypeNotFound(id) => write!(f, "archetype not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VoteError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            RepoError::ArchetypeNotFound(id) => Self::ArchetypeNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// What a `cast_vote` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The user's vote changed. `previous` is `None` when they had not voted.
    Applied { previous: Option<i32>, total: i64 },
    /// Same value as the user's current vote.
    Unchanged,
    /// Negative vote refused because the total is already `<= 0`.
    BelowFloor,
}

impl VoteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, Default)]
struct ItemVotes {
    primary: Option<ArchetypeId>,
    tallies: BTreeMap<ArchetypeId, VoteTally>,
    secondary: BTreeMap<ArchetypeId, i64>,
}

impl ItemVotes {
    fn refresh_secondary(&mut self, archetype_id: ArchetypeId) {
        let total = self
            .tallies
            .get(&archetype_id)
            .map_or(0, |tally| tally.total);
        if total > 0 && Some(archetype_id) != self.primary {
            self.secondary.insert(archetype_id, total);
        } else {
            self.secondary.remove(&archetype_id);
        }
    }
}

/// Per-item vote tallies owned in one place and looked up by item id.
#[derive(Debug, Clone, Default)]
pub struct VoteAggregator {
    items: HashMap<ItemId, ItemVotes>,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an item's state with the tallies implied by `votes`.
    pub fn load_item(&mut self, item_id: ItemId, primary: Option<ArchetypeId>, votes: &[Vote]) {
        let mut record = ItemVotes {
            primary,
            ..ItemVotes::default()
        };
        for vote in votes.iter().filter(|vote| vote.item_id == item_id) {
            record
                .tallies
                .entry(vote.archetype_id)
                .or_default()
                .apply(&vote.user_id, vote.value);
        }
        let archetype_ids = record.tallies.keys().copied().collect::<Vec<_>>();
        for archetype_id in archetype_ids {
            record.refresh_secondary(archetype_id);
        }
        self.items.insert(item_id, record);
    }

    pub fn is_loaded(&self, item_id: ItemId) -> bool {
        self.items.contains_key(&item_id)
    }

    pub fn forget_item(&mut self, item_id: ItemId) -> bool {
        self.items.remove(&item_id).is_some()
    }

    /// Sets `identity`'s vote on (item, archetype) to `value`.
    ///
    /// # Errors
    /// - `Unauthorized` when the identity is not authenticated.
    /// - `PrimaryArchetype` when targeting the item's primary archetype.
    pub fn cast_vote(
        &mut self,
        item_id: ItemId,
        archetype_id: ArchetypeId,
        identity: &Identity,
        value: i32,
    ) -> Result<VoteOutcome, VoteError> {
        if !identity.is_authenticated() {
            return Err(VoteError::Unauthorized);
        }

        let record = self.items.entry(item_id).or_default();
        if record.primary == Some(archetype_id) {
            return Err(VoteError::PrimaryArchetype(archetype_id));
        }

        let current_total = record
            .tallies
            .get(&archetype_id)
            .map_or(0, |tally| tally.total);
        if value < 0 && current_total <= 0 {
            return Ok(VoteOutcome::BelowFloor);
        }

        let user_id = identity.user_id();
        let tally = record.tallies.entry(archetype_id).or_default();
        let had_vote = tally.user_votes.contains_key(user_id);
        let Some(old) = tally.apply(user_id, value) else {
            return Ok(VoteOutcome::Unchanged);
        };
        let total = tally.total;
        record.refresh_secondary(archetype_id);

        Ok(VoteOutcome::Applied {
            previous: had_vote.then_some(old),
            total,
        })
    }

    /// Undoes an `Applied` outcome for `user_id`.
    pub(crate) fn rollback(
        &mut self,
        item_id: ItemId,
        archetype_id: ArchetypeId,
        user_id: &str,
        previous: Option<i32>,
    ) {
        let Some(record) = self.items.get_mut(&item_id) else {
            return;
        };
        if let Some(tally) = record.tallies.get_mut(&archetype_id) {
            tally.revert(user_id, previous.unwrap_or(0), previous.is_some());
        }
        record.refresh_secondary(archetype_id);
    }

    /// Current secondary archetypes, heaviest first.
    pub fn secondary_archetypes(&self, item_id: ItemId) -> Vec<SecondaryArchetype> {
        let Some(record) = self.items.get(&item_id) else {
            return Vec::new();
        };
        let mut secondary = record
            .secondary
            .iter()
            .map(|(archetype_id, weight)| SecondaryArchetype {
                archetype_id: *archetype_id,
                weight: *weight,
            })
            .collect::<Vec<_>>();
        secondary.sort_by(|left, right| {
            right
                .weight
                .cmp(&left.weight)
                .then_with(|| left.archetype_id.cmp(&right.archetype_id))
        });
        secondary
    }

    pub fn tally(&self, item_id: ItemId, archetype_id: ArchetypeId) -> Option<&VoteTally> {
        self.items.get(&item_id)?.tallies.get(&archetype_id)
    }

    pub fn total(&self, item_id: ItemId, archetype_id: ArchetypeId) -> i64 {
        self.tally(item_id, archetype_id)
            .map_or(0, |tally| tally.total)
    }

    /// The votes `user_id` currently holds on one item, by archetype.
    pub fn user_votes(&self, item_id: ItemId, user_id: &str) -> BTreeMap<ArchetypeId, i32> {
        let Some(record) = self.items.get(&item_id) else {
            return BTreeMap::new();
        };
        record
            .tallies
            .iter()
            .filter_map(|(archetype_id, tally)| {
                tally
                    .user_votes
                    .get(user_id)
                    .map(|value| (*archetype_id, *value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{VoteAggregator, VoteError, VoteOutcome};
    use crate::identity::Identity;
    use crate::model::vote::{SecondaryArchetype, Vote};
    use uuid::Uuid;

    const ITEM: i64 = 7;

    fn monk() -> Uuid {
        Uuid::from_u128(4)
    }

    #[test]
    fn positive_then_zero_vote_adds_and_removes_secondary() {
        let mut aggregator = VoteAggregator::new();
        let user_a = Identity::authenticated("a");

        let outcome = aggregator.cast_vote(ITEM, monk(), &user_a, 1).unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Applied {
                previous: None,
                total: 1
            }
        );
        assert_eq!(
            aggregator.secondary_archetypes(ITEM),
            vec![SecondaryArchetype {
                archetype_id: monk(),
                weight: 1
            }]
        );

        let outcome = aggregator.cast_vote(ITEM, monk(), &user_a, 0).unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Applied {
                previous: Some(1),
                total: 0
            }
        );
        assert!(aggregator.secondary_archetypes(ITEM).is_empty());
    }

    #[test]
    fn negative_vote_at_zero_total_is_a_no_op() {
        let mut aggregator = VoteAggregator::new();
        let user = Identity::authenticated("a");
        let outcome = aggregator.cast_vote(ITEM, monk(), &user, -1).unwrap();
        assert_eq!(outcome, VoteOutcome::BelowFloor);
        assert_eq!(aggregator.total(ITEM, monk()), 0);
        assert!(aggregator.tally(ITEM, monk()).is_none());
    }

    #[test]
    fn repeated_vote_is_idempotent() {
        let mut aggregator = VoteAggregator::new();
        let user = Identity::authenticated("a");
        aggregator.cast_vote(ITEM, monk(), &user, 1).unwrap();
        let before = aggregator.tally(ITEM, monk()).cloned();
        let outcome = aggregator.cast_vote(ITEM, monk(), &user, 1).unwrap();
        assert_eq!(outcome, VoteOutcome::Unchanged);
        assert_eq!(aggregator.tally(ITEM, monk()).cloned(), before);
    }

    #[test]
    fn total_tracks_latest_value_of_each_user() {
        let mut aggregator = VoteAggregator::new();
        let sequence = [("a", 1), ("b", 1), ("c", 1), ("a", -1), ("b", 0), ("c", 1)];
        for (user, value) in sequence {
            aggregator
                .cast_vote(ITEM, monk(), &Identity::authenticated(user), value)
                .unwrap();
        }
        let tally = aggregator.tally(ITEM, monk()).unwrap();
        assert_eq!(tally.total, 0);
        assert_eq!(tally.total, tally.recomputed_total());
        assert!(aggregator.secondary_archetypes(ITEM).is_empty());
    }

    #[test]
    fn anonymous_and_primary_votes_are_rejected() {
        let mut aggregator = VoteAggregator::new();
        let err = aggregator
            .cast_vote(ITEM, monk(), &Identity::anonymous("temp_abcdefghi"), 1)
            .unwrap_err();
        assert!(matches!(err, VoteError::Unauthorized));

        aggregator.load_item(ITEM, Some(monk()), &[]);
        let err = aggregator
            .cast_vote(ITEM, monk(), &Identity::authenticated("a"), 1)
            .unwrap_err();
        assert!(matches!(err, VoteError::PrimaryArchetype(_)));
    }

    #[test]
    fn load_item_rebuilds_tallies_and_secondary_set() {
        let sun = Uuid::from_u128(10);
        let votes = vec![
            Vote::new(ITEM, monk(), "a", 1),
            Vote::new(ITEM, monk(), "b", 1),
            Vote::new(ITEM, sun, "a", 1),
            Vote::new(ITEM, sun, "b", -1),
            Vote::new(99, sun, "c", 1),
        ];
        let mut aggregator = VoteAggregator::new();
        aggregator.load_item(ITEM, None, &votes);

        assert_eq!(aggregator.total(ITEM, monk()), 2);
        assert_eq!(aggregator.total(ITEM, sun), 0);
        assert_eq!(
            aggregator.secondary_archetypes(ITEM),
            vec![SecondaryArchetype {
                archetype_id: monk(),
                weight: 2
            }]
        );
        let user_votes = aggregator.user_votes(ITEM, "b");
        assert_eq!(user_votes.get(&sun), Some(&-1));
    }

    #[test]
    fn rollback_restores_state_before_vote() {
        let mut aggregator = VoteAggregator::new();
        let user = Identity::authenticated("a");
        let outcome = aggregator.cast_vote(ITEM, monk(), &user, 1).unwrap();
        let VoteOutcome::Applied { previous, .. } = outcome else {
            panic!("vote should apply");
        };
        aggregator.rollback(ITEM, monk(), "a", previous);
        assert_eq!(aggregator.total(ITEM, monk()), 0);
        assert!(aggregator.user_votes(ITEM, "a").is_empty());
        assert!(aggregator.secondary_archetypes(ITEM).is_empty());
    }
}
