//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read items and archetypes, append archetypes, bump like counters.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Archetype names are unique case-insensitively; duplicates are reported
//!   with the existing record.
//! - Items are listed in ascending numeric id order.

use crate::db::DbError;
use crate::model::archetype::{Archetype, ArchetypeId};
use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::model::story::StoryId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT id, archetype, image, likes FROM items";
const ARCHETYPE_SELECT_SQL: &str = "SELECT id, name, created_at FROM archetypes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by catalog, vote and story stores.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    ItemNotFound(ItemId),
    ArchetypeNotFound(ArchetypeId),
    StoryNotFound(StoryId),
    DuplicateArchetype(Archetype),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ArchetypeNotFound(id) => write!(f, "archetype not found: {id}"),
            Self::StoryNotFound(id) => write!(f, "story not found: {id}"),
            Self::DuplicateArchetype(existing) => {
                write!(f, "archetype already exists: `{}`", existing.name)
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing gallery items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemListQuery {
    /// Every listed name must equal the item's primary archetype
    /// (case-insensitive). Empty means no filter.
    pub archetypes: Vec<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for the gallery catalog.
pub trait CatalogRepository {
    /// Inserts or replaces an item (seed import path).
    fn upsert_item(&self, item: &Item) -> RepoResult<()>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>>;
    fn count_items(&self) -> RepoResult<u64>;
    /// Returns all archetypes sorted by name.
    fn list_archetypes(&self) -> RepoResult<Vec<Archetype>>;
    fn get_archetype(&self, id: ArchetypeId) -> RepoResult<Option<Archetype>>;
    fn find_archetype_by_name(&self, name: &str) -> RepoResult<Option<Archetype>>;
    /// Appends an archetype, rejecting case-insensitive duplicates.
    fn create_archetype(&self, archetype: &Archetype) -> RepoResult<Archetype>;
    /// Increments the like counter and returns the new value.
    fn increment_likes(&self, id: ItemId) -> RepoResult<u64>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn upsert_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (id, archetype, image, likes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                archetype = excluded.archetype,
                image = excluded.image,
                likes = MAX(items.likes, excluded.likes);",
            params![
                item.id,
                item.archetype.as_deref(),
                item.image.as_deref(),
                likes_to_db(item.likes)?,
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        for name in &query.archetypes {
            sql.push_str(" AND trim(archetype) = ? COLLATE NOCASE");
            bind_values.push(Value::Text(name.trim().to_string()));
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn count_items(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative item count `{count}`")))
    }

    fn list_archetypes(&self) -> RepoResult<Vec<Archetype>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARCHETYPE_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut archetypes = Vec::new();
        while let Some(row) = rows.next()? {
            archetypes.push(parse_archetype_row(row)?);
        }
        Ok(archetypes)
    }

    fn get_archetype(&self, id: ArchetypeId) -> RepoResult<Option<Archetype>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARCHETYPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_archetype_row(row)?));
        }
        Ok(None)
    }

    fn find_archetype_by_name(&self, name: &str) -> RepoResult<Option<Archetype>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARCHETYPE_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"
        ))?;
        let mut rows = stmt.query([name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_archetype_row(row)?));
        }
        Ok(None)
    }

    fn create_archetype(&self, archetype: &Archetype) -> RepoResult<Archetype> {
        if let Some(existing) = self.find_archetype_by_name(&archetype.name)? {
            return Err(RepoError::DuplicateArchetype(existing));
        }

        self.conn.execute(
            "INSERT INTO archetypes (id, name) VALUES (?1, ?2);",
            params![archetype.id.to_string(), archetype.name.trim()],
        )?;

        self.get_archetype(archetype.id)?
            .ok_or(RepoError::ArchetypeNotFound(archetype.id))
    }

    fn increment_likes(&self, id: ItemId) -> RepoResult<u64> {
        let likes: Option<i64> = self
            .conn
            .query_row(
                "UPDATE items SET likes = likes + 1 WHERE id = ?1 RETURNING likes;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match likes {
            Some(value) => likes_from_db(value),
            None => Err(RepoError::ItemNotFound(id)),
        }
    }
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let item = Item {
        id: row.get("id")?,
        archetype: row.get("archetype")?,
        image: row.get("image")?,
        likes: likes_from_db(row.get("likes")?)?,
    };
    item.validate()?;
    Ok(item)
}

pub(crate) fn parse_archetype_row(row: &Row<'_>) -> RepoResult<Archetype> {
    let id_text: String = row.get("id")?;
    Ok(Archetype {
        id: parse_uuid(&id_text, "archetypes.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn likes_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative like count `{value}`")))
}

fn likes_to_db(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("like count `{value}` out of range")))
}
