//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose gallery, archetype, vote and story use-cases to Dart via FRB.
//! - Keep error semantics simple: every call returns a plain envelope.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Each call opens its own connection; vote tallies are re-hydrated from
//!   the store on every vote call.
//! - Callers without a session share one anonymous id per process, persisted
//!   under the temp dir unless the config names a file.

use gallery_core::db::open_db;
use gallery_core::{
    archetype_color, core_version as core_version_inner, init_logging as init_logging_inner,
    load_config, ping as ping_inner, Archetype, CatalogService, FsImageProbe, GalleryConfig,
    GalleryQuery, Identity, IdentityProvider, ImageProbe, ImageResolverRegistry, Item,
    LocalIdentityProvider, NamedSecondaryArchetype, ProbeOutcome, ResolveState,
    SqliteCatalogRepository, SqliteStoryRepository, SqliteVoteRepository, Story, StoryService,
    VoteOutcome, VoteService,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const GALLERY_DB_FILE_NAME: &str = "archetype_gallery.sqlite3";
const GALLERY_TEMP_USER_FILE_NAME: &str = "archetype_gallery_temp_user_id";
static GALLERY_CONFIG: OnceLock<GalleryConfig> = OnceLock::new();
static ANONYMOUS_PROVIDER: OnceLock<LocalIdentityProvider> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Gallery card projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItemView {
    pub id: i64,
    pub archetype: Option<String>,
    pub likes: u64,
    /// Ordered thumbnail candidates; the UI probes them in order.
    pub thumbnail_candidates: Vec<String>,
    pub fallback_image: String,
    pub badge_background: String,
    pub badge_text: String,
}

/// Gallery page envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPageResponse {
    pub ok: bool,
    pub items: Vec<GalleryItemView>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeView {
    pub id: String,
    pub name: String,
}

/// Archetype list envelope. `degraded` marks the built-in fallback list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeListResponse {
    pub ok: bool,
    pub items: Vec<ArchetypeView>,
    pub degraded: bool,
    pub message: String,
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created or affected record id, when there is one.
    pub id: Option<String>,
    /// Updated counter, when the action changes one.
    pub count: Option<u64>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>, count: Option<u64>) -> Self {
        Self {
            ok: true,
            id,
            count,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            count: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryArchetypeView {
    pub archetype_id: String,
    pub name: String,
    pub weight: i64,
}

/// Vote envelope carrying the item's refreshed secondary set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResponse {
    pub ok: bool,
    /// Whether the store changed.
    pub applied: bool,
    pub total: i64,
    pub secondary: Vec<SecondaryArchetypeView>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryView {
    pub id: String,
    pub item_id: i64,
    pub body: String,
    pub likes: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryListResponse {
    pub ok: bool,
    pub items: Vec<StoryView>,
    pub message: String,
}

/// Thumbnail resolution envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResponse {
    pub path: String,
    pub is_fallback: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub user_id: String,
    pub authenticated: bool,
}

/// Lists one gallery page.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `page` is 1-based; `0` reads as `1`. `page_size` defaults and caps per config.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_page(
    archetypes: Vec<String>,
    page: u32,
    page_size: Option<u32>,
) -> GalleryPageResponse {
    let config = resolve_config();
    let query = GalleryQuery {
        archetypes,
        page,
        page_size,
    };
    let result = with_connection(|conn| {
        let service =
            CatalogService::with_config(SqliteCatalogRepository::new(conn), config.clone());
        service.list_items(&query).map_err(|err| err.to_string())
    });

    match result {
        Ok(gallery) => GalleryPageResponse {
            ok: true,
            items: gallery
                .items
                .iter()
                .map(|item| to_gallery_item_view(config, item))
                .collect(),
            page: gallery.page,
            page_size: gallery.page_size,
            has_more: gallery.has_more,
            message: String::new(),
        },
        Err(err) => GalleryPageResponse {
            ok: false,
            items: Vec::new(),
            page: page.max(1),
            page_size: config.normalize_page_size(page_size),
            has_more: false,
            message: format!("gallery_page failed: {err}"),
        },
    }
}

/// Lists the archetype catalog sorted by name.
///
/// # FFI contract
/// - Falls back to the built-in list (`degraded = true`) when the store is
///   unreadable; `ok` is still `true` in that case.
#[flutter_rust_bridge::frb(sync)]
pub fn archetype_list() -> ArchetypeListResponse {
    match with_connection(|conn| {
        Ok(CatalogService::new(SqliteCatalogRepository::new(conn)).list_archetypes())
    }) {
        Ok(catalog) => ArchetypeListResponse {
            ok: true,
            items: catalog.archetypes.iter().map(to_archetype_view).collect(),
            degraded: catalog.degraded,
            message: String::new(),
        },
        Err(err) => ArchetypeListResponse {
            ok: true,
            items: gallery_core::default_archetypes()
                .iter()
                .map(to_archetype_view)
                .collect(),
            degraded: true,
            message: format!("archetype_list degraded: {err}"),
        },
    }
}

/// Lists archetypes an item can be voted into (catalog minus its primary).
#[flutter_rust_bridge::frb(sync)]
pub fn archetype_votable(item_id: i64) -> ArchetypeListResponse {
    let result = with_connection(|conn| {
        let service = CatalogService::new(SqliteCatalogRepository::new(conn));
        let item = service.get_item(item_id).map_err(|err| err.to_string())?;
        Ok(service.votable_archetypes(&item))
    });
    match result {
        Ok(archetypes) => ArchetypeListResponse {
            ok: true,
            items: archetypes.iter().map(to_archetype_view).collect(),
            degraded: false,
            message: String::new(),
        },
        Err(err) => ArchetypeListResponse {
            ok: false,
            items: Vec::new(),
            degraded: false,
            message: format!("archetype_votable failed: {err}"),
        },
    }
}

/// Appends an archetype to the catalog.
#[flutter_rust_bridge::frb(sync)]
pub fn archetype_create(name: String) -> ActionResponse {
    let result = with_connection(|conn| {
        CatalogService::new(SqliteCatalogRepository::new(conn))
            .create_archetype(&name)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(created) => {
            ActionResponse::success("Archetype created.", Some(created.id.to_string()), None)
        }
        Err(err) => ActionResponse::failure(format!("archetype_create failed: {err}")),
    }
}

/// Increments an item's like counter.
#[flutter_rust_bridge::frb(sync)]
pub fn item_like(item_id: i64) -> ActionResponse {
    let result = with_connection(|conn| {
        CatalogService::new(SqliteCatalogRepository::new(conn))
            .like_item(item_id)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(likes) => ActionResponse::success("Liked.", Some(item_id.to_string()), Some(likes)),
        Err(err) => ActionResponse::failure(format!("item_like failed: {err}")),
    }
}

/// Casts the session user's vote on (item, archetype).
///
/// # FFI contract
/// - `session_user_id = None` means anonymous; anonymous votes are rejected.
/// - Returns the item's stored secondary set after the vote.
#[flutter_rust_bridge::frb(sync)]
pub fn vote_cast(
    item_id: i64,
    archetype_id: String,
    session_user_id: Option<String>,
    value: i32,
) -> VoteResponse {
    let identity = resolve_identity(session_user_id.as_deref());
    let result = with_connection(|conn| {
        let archetype_id = Uuid::parse_str(archetype_id.trim())
            .map_err(|_| format!("invalid archetype id `{archetype_id}`"))?;
        let mut service = VoteService::new(SqliteVoteRepository::new(conn));
        let outcome = service
            .cast_vote(item_id, archetype_id, &identity, value)
            .map_err(|err| err.to_string())?;
        let secondary = service
            .stored_secondary_archetypes(item_id)
            .map_err(|err| err.to_string())?;
        Ok((outcome, service.total(item_id, archetype_id), secondary))
    });

    match result {
        Ok((outcome, total, secondary)) => VoteResponse {
            ok: true,
            applied: outcome.is_applied(),
            total,
            secondary: secondary.into_iter().map(to_secondary_view).collect(),
            message: vote_message(outcome).to_string(),
        },
        Err(err) => VoteResponse {
            ok: false,
            applied: false,
            total: 0,
            secondary: Vec::new(),
            message: format!("vote_cast failed: {err}"),
        },
    }
}

/// Adds a story to an item.
#[flutter_rust_bridge::frb(sync)]
pub fn story_add(item_id: i64, text: String) -> ActionResponse {
    let result = with_connection(|conn| {
        StoryService::new(SqliteStoryRepository::new(conn))
            .add_story(item_id, &text)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(story) => ActionResponse::success("Story added.", Some(story.id.to_string()), None),
        Err(err) => ActionResponse::failure(format!("story_add failed: {err}")),
    }
}

/// Lists an item's stories, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn story_list(item_id: i64) -> StoryListResponse {
    let result = with_connection(|conn| {
        StoryService::new(SqliteStoryRepository::new(conn))
            .list_stories(item_id)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(stories) => StoryListResponse {
            ok: true,
            items: stories.into_iter().map(to_story_view).collect(),
            message: String::new(),
        },
        Err(err) => StoryListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("story_list failed: {err}"),
        },
    }
}

/// Likes a story once per user; anonymous users count by their temp id.
#[flutter_rust_bridge::frb(sync)]
pub fn story_like(story_id: String, session_user_id: Option<String>) -> ActionResponse {
    let identity = resolve_identity(session_user_id.as_deref());
    let result = with_connection(|conn| {
        let story_id = Uuid::parse_str(story_id.trim())
            .map_err(|_| format!("invalid story id `{story_id}`"))?;
        let mut service = StoryService::new(SqliteStoryRepository::new(conn));
        let counted = service
            .like_story(story_id, &identity)
            .map_err(|err| err.to_string())?;
        let likes = service
            .get_story(story_id)
            .map_err(|err| err.to_string())?
            .likes;
        Ok((story_id, counted, likes))
    });
    match result {
        Ok((story_id, counted, likes)) => ActionResponse::success(
            if counted { "Liked." } else { "Already liked." },
            Some(story_id.to_string()),
            Some(likes),
        ),
        Err(err) => ActionResponse::failure(format!("story_like failed: {err}")),
    }
}

/// Resolves an item's thumbnail against the configured public directory.
///
/// # FFI contract
/// - Without a configured `public_dir` every candidate is treated as missing
///   and the fallback image is returned.
/// - Never fails; unknown items resolve to the fallback without probing.
#[flutter_rust_bridge::frb(sync)]
pub fn thumbnail_resolve(item_id: i64) -> ThumbnailResponse {
    let config = resolve_config();
    match config.public_dir.as_ref() {
        Some(public_dir) => resolve_thumbnail(config, item_id, &mut FsImageProbe::new(public_dir)),
        None => resolve_thumbnail(config, item_id, &mut |_: &str| ProbeOutcome::Failed),
    }
}

fn resolve_thumbnail(
    config: &GalleryConfig,
    item_id: i64,
    probe: &mut impl ImageProbe,
) -> ThumbnailResponse {
    let fallback = || ThumbnailResponse {
        path: config.fallback_image.clone(),
        is_fallback: true,
        width: None,
        height: None,
    };
    let lookup = with_connection(|conn| {
        CatalogService::new(SqliteCatalogRepository::new(conn))
            .get_item(item_id)
            .map_err(|err| err.to_string())
    });
    let item = match lookup {
        Ok(item) => item,
        Err(err) => {
            log::debug!(
                "event=thumbnail_resolve module=ffi status=fallback item_id={item_id} error={err}"
            );
            return fallback();
        }
    };

    match ImageResolverRegistry::from_config(config).resolve_with(&item, probe) {
        ResolveState::Resolved { path, dimensions } => ThumbnailResponse {
            path,
            is_fallback: false,
            width: dimensions.map(|value| value.width),
            height: dimensions.map(|value| value.height),
        },
        ResolveState::Fallback { path } => ThumbnailResponse {
            path,
            is_fallback: true,
            width: None,
            height: None,
        },
        ResolveState::Pending { .. } => fallback(),
    }
}

/// Returns the caller identity the other calls act on.
#[flutter_rust_bridge::frb(sync)]
pub fn current_user(session_user_id: Option<String>) -> UserView {
    let identity = resolve_identity(session_user_id.as_deref());
    UserView {
        user_id: identity.user_id().to_string(),
        authenticated: identity.is_authenticated(),
    }
}

fn resolve_config() -> &'static GalleryConfig {
    GALLERY_CONFIG.get_or_init(|| {
        let mut config = match std::env::var("GALLERY_CONFIG_PATH") {
            Ok(raw) if !raw.trim().is_empty() => {
                load_config(raw.trim()).unwrap_or_else(|err| {
                    log::warn!(
                        "event=config_load module=ffi status=error error_code=config_invalid error={err}"
                    );
                    GalleryConfig::default()
                })
            }
            _ => GalleryConfig::default(),
        };
        if let Ok(raw) = std::env::var("GALLERY_DB_PATH") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.db_path = Some(PathBuf::from(trimmed));
            }
        }
        config
    })
}

fn resolve_db_path() -> PathBuf {
    resolve_config()
        .db_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(GALLERY_DB_FILE_NAME))
}

fn with_connection<T>(f: impl FnOnce(&mut Connection) -> Result<T, String>) -> Result<T, String> {
    let mut conn =
        open_db(resolve_db_path()).map_err(|err| format!("gallery DB open failed: {err}"))?;
    f(&mut conn)
}

fn resolve_temp_user_id_path() -> PathBuf {
    resolve_config()
        .temp_user_id_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(GALLERY_TEMP_USER_FILE_NAME))
}

/// Session user when present, otherwise the process-wide anonymous id.
fn resolve_identity(session_user_id: Option<&str>) -> Identity {
    let session_user = session_user_id
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match session_user {
        Some(user_id) => Identity::authenticated(user_id),
        None => ANONYMOUS_PROVIDER
            .get_or_init(|| LocalIdentityProvider::new(Some(resolve_temp_user_id_path())))
            .current_identity(),
    }
}

fn vote_message(outcome: VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::Applied { .. } => "Vote recorded.",
        VoteOutcome::Unchanged => "Vote unchanged.",
        VoteOutcome::BelowFloor => "Vote ignored: total is already at zero.",
    }
}

fn to_gallery_item_view(config: &GalleryConfig, item: &Item) -> GalleryItemView {
    let color = archetype_color(item.primary_archetype());
    GalleryItemView {
        id: item.id,
        archetype: item.primary_archetype().map(str::to_string),
        likes: item.likes,
        thumbnail_candidates: gallery_core::candidate_paths(
            &config.thumbnail_root,
            &gallery_core::ImageSource::from(item),
        ),
        fallback_image: config.fallback_image.clone(),
        badge_background: color.background.to_string(),
        badge_text: color.text.to_string(),
    }
}

fn to_archetype_view(archetype: &Archetype) -> ArchetypeView {
    ArchetypeView {
        id: archetype.id.to_string(),
        name: archetype.name.clone(),
    }
}

fn to_secondary_view(entry: NamedSecondaryArchetype) -> SecondaryArchetypeView {
    SecondaryArchetypeView {
        archetype_id: entry.archetype_id.to_string(),
        name: entry.name,
        weight: entry.weight,
    }
}

fn to_story_view(story: Story) -> StoryView {
    StoryView {
        id: story.id.to_string(),
        item_id: story.item_id,
        body: story.body,
        likes: story.likes,
        created_at: story.created_at,
    }
}
