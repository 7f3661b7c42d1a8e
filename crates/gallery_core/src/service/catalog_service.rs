//! Gallery catalog use-case service.
//!
//! # Responsibility
//! - Page through items with an optional archetype filter.
//! - Serve the archetype catalog, falling back to built-in defaults.
//! - Create archetypes and bump item likes.
//!
//! # Invariants
//! - Pages are 1-based; page `0` is treated as page `1`.
//! - Page size defaults to the configured default and never exceeds the max.
//! - The archetype list is always sorted by name.

use crate::config::GalleryConfig;
use crate::model::archetype::{
    default_archetypes, normalize_archetype_name, sort_archetypes, Archetype,
};
use crate::model::item::{Item, ItemId};
use crate::repo::catalog_repo::{CatalogRepository, ItemListQuery, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum CatalogServiceError {
    /// Archetype name is blank after trimming.
    InvalidName(String),
    /// Name collides case-insensitively with an existing entry.
    DuplicateArchetype(Archetype),
    ItemNotFound(ItemId),
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "invalid archetype name: `{value}`"),
            Self::DuplicateArchetype(existing) => {
                write!(f, "archetype already exists: `{}`", existing.name)
            }
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateArchetype(existing) => Self::DuplicateArchetype(existing),
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Gallery page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryQuery {
    pub archetypes: Vec<String>,
    /// 1-based; `0` reads as `1`.
    pub page: u32,
    pub page_size: Option<u32>,
}

/// One page of gallery items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPage {
    pub items: Vec<Item>,
    pub page: u32,
    /// Effective page size after defaults and capping.
    pub page_size: u32,
    pub has_more: bool,
}

/// Archetype list plus whether it came from the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeCatalog {
    pub archetypes: Vec<Archetype>,
    pub degraded: bool,
}

/// Catalog service facade over repository implementations.
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
    config: GalleryConfig,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, GalleryConfig::default())
    }

    pub fn with_config(repo: R, config: GalleryConfig) -> Self {
        Self { repo, config }
    }

    /// Lists one page of items ordered by id.
    pub fn list_items(&self, query: &GalleryQuery) -> Result<GalleryPage, CatalogServiceError> {
        let started_at = Instant::now();
        let page = query.page.max(1);
        let page_size = self.config.normalize_page_size(query.page_size);
        let archetypes = query
            .archetypes
            .iter()
            .filter_map(|name| normalize_archetype_name(name))
            .collect::<Vec<_>>();

        let mut items = self.repo.list_items(&ItemListQuery {
            archetypes,
            limit: Some(page_size.saturating_add(1)),
            offset: (page - 1).saturating_mul(page_size),
        })?;
        let has_more = items.len() > page_size as usize;
        items.truncate(page_size as usize);

        info!(
            "event=gallery_page module=catalog status=ok page={page} page_size={page_size} items={} has_more={has_more} duration_ms={}",
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(GalleryPage {
            items,
            page,
            page_size,
            has_more,
        })
    }

    pub fn get_item(&self, id: ItemId) -> Result<Item, CatalogServiceError> {
        self.repo
            .get_item(id)?
            .ok_or(CatalogServiceError::ItemNotFound(id))
    }

    /// Archetype catalog sorted by name.
    ///
    /// Store failures are not surfaced; the built-in list is returned with
    /// `degraded = true` instead.
    pub fn list_archetypes(&self) -> ArchetypeCatalog {
        match self.repo.list_archetypes() {
            Ok(mut archetypes) => {
                sort_archetypes(&mut archetypes);
                ArchetypeCatalog {
                    archetypes,
                    degraded: false,
                }
            }
            Err(err) => {
                warn!(
                    "event=archetype_list module=catalog status=degraded error_code=archetype_fetch_failed error={err}"
                );
                ArchetypeCatalog {
                    archetypes: default_archetypes(),
                    degraded: true,
                }
            }
        }
    }

    /// Archetypes an item can be voted into: everything but its primary.
    pub fn votable_archetypes(&self, item: &Item) -> Vec<Archetype> {
        self.list_archetypes()
            .archetypes
            .into_iter()
            .filter(|archetype| !item.is_primary_archetype(&archetype.name))
            .collect()
    }

    /// Appends a new archetype.
    ///
    /// # Errors
    /// - `InvalidName` for blank names.
    /// - `DuplicateArchetype` carrying the existing record on collision.
    pub fn create_archetype(&self, name: &str) -> Result<Archetype, CatalogServiceError> {
        let normalized = normalize_archetype_name(name)
            .ok_or_else(|| CatalogServiceError::InvalidName(name.to_string()))?;
        let created = self.repo.create_archetype(&Archetype::new(normalized))?;
        info!(
            "event=archetype_create module=catalog status=ok archetype_id={}",
            created.id
        );
        Ok(created)
    }

    /// Increments an item's like counter and returns the new count.
    pub fn like_item(&self, id: ItemId) -> Result<u64, CatalogServiceError> {
        let likes = self.repo.increment_likes(id)?;
        info!("event=item_like module=catalog status=ok item_id={id} likes={likes}");
        Ok(likes)
    }

    pub fn count_items(&self) -> Result<u64, CatalogServiceError> {
        Ok(self.repo.count_items()?)
    }
}
