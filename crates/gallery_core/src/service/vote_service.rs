//! Archetype vote use-case service.
//!
//! # Responsibility
//! - Hydrate the in-memory aggregator from the vote store on first use.
//! - Apply votes optimistically, then persist them; undo the in-memory change
//!   when the store write fails.
//!
//! # Invariants
//! - Unauthenticated callers are rejected before any store access.
//! - Below-floor and unchanged votes never reach the store.
//! - After a failed write the aggregator holds the pre-vote state.

use crate::identity::Identity;
use crate::model::archetype::ArchetypeId;
use crate::model::item::{Item, ItemId};
use crate::model::vote::{NamedSecondaryArchetype, SecondaryArchetype, Vote};
use crate::repo::vote_repo::VoteRepository;
use crate::service::aggregator::{VoteAggregator, VoteError, VoteOutcome};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

/// Vote service facade over a vote repository.
pub struct VoteService<R: VoteRepository> {
    repo: R,
    aggregator: VoteAggregator,
}

impl<R: VoteRepository> VoteService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            aggregator: VoteAggregator::new(),
        }
    }

    /// (Re)loads one item's tallies from the store and returns the item.
    pub fn open_item(&mut self, item_id: ItemId) -> Result<Item, VoteError> {
        let item = self
            .repo
            .get_item(item_id)?
            .ok_or(VoteError::ItemNotFound(item_id))?;
        self.hydrate(&item)?;
        Ok(item)
    }

    /// Sets the caller's vote on (item, archetype) and persists it.
    ///
    /// # Errors
    /// - `Unauthorized` for anonymous callers.
    /// - `ItemNotFound` / `ArchetypeNotFound` for unknown targets.
    /// - `PrimaryArchetype` when the archetype is the item's own.
    /// - `Repo` when the store write fails; the in-memory vote is undone.
    pub fn cast_vote(
        &mut self,
        item_id: ItemId,
        archetype_id: ArchetypeId,
        identity: &Identity,
        value: i32,
    ) -> Result<VoteOutcome, VoteError> {
        if !identity.is_authenticated() {
            warn!("event=vote_cast module=vote status=rejected item_id={item_id} reason=unauthorized");
            return Err(VoteError::Unauthorized);
        }

        let started_at = Instant::now();
        let item = self.ensure_loaded(item_id)?;
        let archetype = self
            .repo
            .get_archetype(archetype_id)?
            .ok_or(VoteError::ArchetypeNotFound(archetype_id))?;
        if item.is_primary_archetype(&archetype.name) {
            return Err(VoteError::PrimaryArchetype(archetype_id));
        }

        let outcome = self
            .aggregator
            .cast_vote(item_id, archetype_id, identity, value)?;
        let VoteOutcome::Applied { previous, total } = outcome else {
            info!(
                "event=vote_cast module=vote status=skipped item_id={item_id} archetype_id={archetype_id} outcome={outcome:?}"
            );
            return Ok(outcome);
        };

        let vote = Vote::new(item_id, archetype_id, identity.user_id(), value);
        match self.repo.record_vote(&vote) {
            Ok(write) => {
                info!(
                    "event=vote_cast module=vote status=ok item_id={item_id} archetype_id={archetype_id} total={total} write={write:?} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Err(err) => {
                self.aggregator
                    .rollback(item_id, archetype_id, identity.user_id(), previous);
                error!(
                    "event=vote_cast module=vote status=error item_id={item_id} archetype_id={archetype_id} duration_ms={} error_code=vote_write_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(VoteError::Repo(err))
            }
        }
    }

    /// In-memory secondary set, heaviest first. Empty for unloaded items.
    pub fn secondary_archetypes(&self, item_id: ItemId) -> Vec<SecondaryArchetype> {
        self.aggregator.secondary_archetypes(item_id)
    }

    /// Secondary set as recorded by the store, with archetype names.
    pub fn stored_secondary_archetypes(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<NamedSecondaryArchetype>, VoteError> {
        Ok(self.repo.list_secondary_archetypes(item_id)?)
    }

    /// The caller's current votes on one item.
    pub fn user_votes(&self, item_id: ItemId, identity: &Identity) -> BTreeMap<ArchetypeId, i32> {
        self.aggregator.user_votes(item_id, identity.user_id())
    }

    pub fn total(&self, item_id: ItemId, archetype_id: ArchetypeId) -> i64 {
        self.aggregator.total(item_id, archetype_id)
    }

    pub fn forget_item(&mut self, item_id: ItemId) -> bool {
        self.aggregator.forget_item(item_id)
    }

    fn ensure_loaded(&mut self, item_id: ItemId) -> Result<Item, VoteError> {
        let item = self
            .repo
            .get_item(item_id)?
            .ok_or(VoteError::ItemNotFound(item_id))?;
        if !self.aggregator.is_loaded(item_id) {
            self.hydrate(&item)?;
        }
        Ok(item)
    }

    fn hydrate(&mut self, item: &Item) -> Result<(), VoteError> {
        let primary = match item.primary_archetype() {
            Some(name) => self.repo.find_archetype_by_name(name)?.map(|a| a.id),
            None => None,
        };
        let votes = self.repo.list_votes_for_item(item.id)?;
        self.aggregator.load_item(item.id, primary, &votes);
        info!(
            "event=vote_hydrate module=vote status=ok item_id={} votes={}",
            item.id,
            votes.len()
        );
        Ok(())
    }
}
