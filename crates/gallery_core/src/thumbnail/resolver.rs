//! Thumbnail resolution state machine.
//!
//! # Responsibility
//! - Walk an item's candidate list one probe at a time.
//! - Own per-item resolvers so views look them up by item id instead of
//!   keeping their own cursors.
//!
//! # Invariants
//! - At most one probe is in flight per resolver.
//! - Outcomes carrying a stale ticket are ignored. Every resolver gets a
//!   process-unique epoch, so a ticket is only accepted by the resolver
//!   that issued it.
//! - Exhausting the candidates ends in `Fallback`, never in an error.

use crate::config::GalleryConfig;
use crate::model::item::{Item, ItemId};
use crate::thumbnail::candidates::{
    candidate_paths, ImageSource, DEFAULT_FALLBACK_IMAGE, DEFAULT_THUMBNAIL_ROOT,
};
use crate::thumbnail::probe::{Dimensions, ImageProbe, ProbeOutcome};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

/// Where a resolver currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveState {
    /// Waiting on (or about to start) the probe at `cursor`.
    Pending { cursor: usize },
    /// A candidate loaded.
    Resolved {
        path: String,
        dimensions: Option<Dimensions>,
    },
    /// No candidate loaded; the placeholder is shown.
    Fallback { path: String },
}

/// Identifies one in-flight probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTicket {
    pub item_id: Option<ItemId>,
    epoch: u64,
    cursor: usize,
}

/// A probe the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub ticket: ProbeTicket,
    pub path: String,
}

/// Effect of feeding one probe outcome back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stale or unexpected ticket; nothing changed.
    Ignored,
    /// Probe failed; the next candidate is now pending.
    Advanced { cursor: usize },
    Resolved,
    /// Candidates exhausted after `tried` probes.
    FellBack { tried: usize },
}

/// Resolution of one item's thumbnail.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    item_id: Option<ItemId>,
    epoch: u64,
    candidates: Vec<String>,
    fallback: String,
    state: ResolveState,
    in_flight: bool,
}

impl ImageResolver {
    /// Creates a resolver. An empty candidate list settles on the fallback
    /// immediately.
    pub fn new(candidates: Vec<String>, fallback: impl Into<String>) -> Self {
        Self::with_epoch(None, next_epoch(), candidates, fallback.into())
    }

    /// Resolver for `item` using the default thumbnail root and placeholder.
    pub fn for_item(item: &Item) -> Self {
        let candidates = candidate_paths(DEFAULT_THUMBNAIL_ROOT, &ImageSource::from(item));
        Self::with_epoch(
            Some(item.id),
            next_epoch(),
            candidates,
            DEFAULT_FALLBACK_IMAGE.to_string(),
        )
    }

    fn with_epoch(
        item_id: Option<ItemId>,
        epoch: u64,
        candidates: Vec<String>,
        fallback: String,
    ) -> Self {
        let state = if candidates.is_empty() {
            ResolveState::Fallback {
                path: fallback.clone(),
            }
        } else {
            ResolveState::Pending { cursor: 0 }
        };
        Self {
            item_id,
            epoch,
            candidates,
            fallback,
            state,
            in_flight: false,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn state(&self) -> &ResolveState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self.state, ResolveState::Pending { .. })
    }

    /// Terminal path: the loaded candidate or the fallback.
    pub fn resolved_path(&self) -> Option<&str> {
        match &self.state {
            ResolveState::Pending { .. } => None,
            ResolveState::Resolved { path, .. } | ResolveState::Fallback { path } => {
                Some(path.as_str())
            }
        }
    }

    /// Path to show right now: the pending candidate while probing.
    pub fn display_path(&self) -> &str {
        match &self.state {
            ResolveState::Pending { cursor } => self
                .candidates
                .get(*cursor)
                .map_or(self.fallback.as_str(), String::as_str),
            ResolveState::Resolved { path, .. } | ResolveState::Fallback { path } => path.as_str(),
        }
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        match &self.state {
            ResolveState::Resolved { dimensions, .. } => *dimensions,
            _ => None,
        }
    }

    /// Hands out the next probe. Returns `None` while one is in flight or
    /// once resolution is complete.
    pub fn start_probe(&mut self) -> Option<ProbeRequest> {
        let ResolveState::Pending { cursor } = self.state else {
            return None;
        };
        if self.in_flight {
            return None;
        }
        let path = self.candidates.get(cursor)?.clone();
        self.in_flight = true;
        Some(ProbeRequest {
            ticket: ProbeTicket {
                item_id: self.item_id,
                epoch: self.epoch,
                cursor,
            },
            path,
        })
    }

    /// Applies a probe outcome.
    pub fn complete_probe(&mut self, ticket: ProbeTicket, outcome: ProbeOutcome) -> Transition {
        let ResolveState::Pending { cursor } = self.state else {
            return Transition::Ignored;
        };
        if !self.in_flight
            || ticket.item_id != self.item_id
            || ticket.epoch != self.epoch
            || ticket.cursor != cursor
        {
            return Transition::Ignored;
        }
        self.in_flight = false;

        match outcome {
            ProbeOutcome::Loaded(dimensions) => {
                self.state = ResolveState::Resolved {
                    path: self.candidates[cursor].clone(),
                    dimensions,
                };
                Transition::Resolved
            }
            ProbeOutcome::Failed => {
                let next = cursor + 1;
                if next < self.candidates.len() {
                    self.state = ResolveState::Pending { cursor: next };
                    Transition::Advanced { cursor: next }
                } else {
                    self.state = ResolveState::Fallback {
                        path: self.fallback.clone(),
                    };
                    Transition::FellBack {
                        tried: self.candidates.len(),
                    }
                }
            }
        }
    }

    /// Drives the state machine to completion against `probe`.
    pub fn resolve_with(&mut self, probe: &mut impl ImageProbe) -> &ResolveState {
        while let Some(request) = self.start_probe() {
            let outcome = probe.probe(&request.path);
            self.complete_probe(request.ticket, outcome);
        }
        &self.state
    }
}

type FallbackObserver = Box<dyn FnMut(ItemId, usize)>;

/// Owns one resolver per item id.
pub struct ImageResolverRegistry {
    thumbnail_root: String,
    fallback: String,
    resolvers: HashMap<ItemId, ImageResolver>,
    on_fallback: Option<FallbackObserver>,
}

impl Default for ImageResolverRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_ROOT, DEFAULT_FALLBACK_IMAGE)
    }
}

impl ImageResolverRegistry {
    pub fn new(thumbnail_root: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            thumbnail_root: thumbnail_root.into(),
            fallback: fallback.into(),
            resolvers: HashMap::new(),
            on_fallback: None,
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(config.thumbnail_root.as_str(), config.fallback_image.as_str())
    }

    /// Registers a callback invoked with `(item_id, tried)` on exhaustion.
    pub fn set_fallback_observer(&mut self, observer: impl FnMut(ItemId, usize) + 'static) {
        self.on_fallback = Some(Box::new(observer));
    }

    /// Returns the item's resolver, creating it on first use.
    pub fn track(&mut self, item: &Item) -> &ImageResolver {
        let root = self.thumbnail_root.as_str();
        let fallback = self.fallback.as_str();
        self.resolvers.entry(item.id).or_insert_with(|| {
            let candidates = candidate_paths(root, &ImageSource::from(item));
            debug!(
                "event=thumbnail_track module=thumbnail status=ok item_id={} candidates={}",
                item.id,
                candidates.len()
            );
            ImageResolver::with_epoch(
                Some(item.id),
                next_epoch(),
                candidates,
                fallback.to_string(),
            )
        })
    }

    pub fn get(&self, item_id: ItemId) -> Option<&ImageResolver> {
        self.resolvers.get(&item_id)
    }

    pub fn start_probe(&mut self, item_id: ItemId) -> Option<ProbeRequest> {
        self.resolvers.get_mut(&item_id)?.start_probe()
    }

    /// Routes an outcome to its resolver; outcomes for discarded items are
    /// ignored.
    pub fn complete_probe(&mut self, ticket: ProbeTicket, outcome: ProbeOutcome) -> Transition {
        let Some(item_id) = ticket.item_id else {
            return Transition::Ignored;
        };
        let Some(resolver) = self.resolvers.get_mut(&item_id) else {
            debug!("event=thumbnail_probe module=thumbnail status=ignored item_id={item_id}");
            return Transition::Ignored;
        };

        let transition = resolver.complete_probe(ticket, outcome);
        if let Transition::FellBack { tried } = transition {
            info!(
                "event=thumbnail_fallback module=thumbnail status=ok item_id={item_id} tried={tried}"
            );
            if let Some(observer) = self.on_fallback.as_mut() {
                observer(item_id, tried);
            }
        }
        transition
    }

    /// Resolves `item` synchronously against `probe`.
    pub fn resolve_with(&mut self, item: &Item, probe: &mut impl ImageProbe) -> ResolveState {
        self.track(item);
        while let Some(request) = self.start_probe(item.id) {
            let outcome = probe.probe(&request.path);
            self.complete_probe(request.ticket, outcome);
        }
        self.get(item.id)
            .map(|resolver| resolver.state().clone())
            .unwrap_or_else(|| ResolveState::Fallback {
                path: self.fallback.clone(),
            })
    }

    /// Drops the item's resolver; late outcomes for it are ignored.
    pub fn discard(&mut self, item_id: ItemId) -> bool {
        self.resolvers.remove(&item_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
