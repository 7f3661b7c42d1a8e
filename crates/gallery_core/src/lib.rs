//! Core domain logic for the archetype gallery.
//! This crate is the single source of truth for catalog and vote invariants.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;
pub mod thumbnail;

pub use config::{load_config, ConfigError, GalleryConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use identity::{Identity, IdentityProvider, LocalIdentityProvider};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::archetype::{
    archetype_color, default_archetypes, Archetype, ArchetypeColor, ArchetypeId,
};
pub use model::item::{Item, ItemId, ItemValidationError};
pub use model::story::{Story, StoryId};
pub use model::vote::{NamedSecondaryArchetype, SecondaryArchetype, UserId, Vote, VoteTally};
pub use repo::catalog_repo::{
    CatalogRepository, ItemListQuery, RepoError, RepoResult, SqliteCatalogRepository,
};
pub use repo::story_repo::{SqliteStoryRepository, StoryRepository};
pub use repo::vote_repo::{SqliteVoteRepository, VoteRepository};
pub use seed::{
    import_seed, import_seed_file, import_seed_json, SeedDocument, SeedError, SeedReport,
};
pub use service::aggregator::{VoteAggregator, VoteError, VoteOutcome};
pub use service::catalog_service::{
    ArchetypeCatalog, CatalogService, CatalogServiceError, GalleryPage, GalleryQuery,
};
pub use service::story_service::{StoryService, StoryServiceError};
pub use service::vote_service::VoteService;
pub use thumbnail::candidates::{candidate_paths, ImageSource};
pub use thumbnail::probe::{Dimensions, FsImageProbe, ImageProbe, ProbeOutcome};
pub use thumbnail::resolver::{ImageResolver, ImageResolverRegistry, ResolveState};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
