//! Archetype vote repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist one vote per (item, archetype, user) and keep the aggregated
//!   (item, archetype) total record in step with it.
//! - Serve the store-side secondary archetype view.
//!
//! # Invariants
//! - `record_vote` updates the vote row and the total record in a single
//!   transaction; an unchanged value touches neither.
//! - Stored totals change only by `new_value - old_value`.

use crate::model::archetype::{Archetype, ArchetypeId};
use crate::model::item::{Item, ItemId};
use crate::model::vote::{NamedSecondaryArchetype, Vote, VoteWrite};
use crate::repo::catalog_repo::{
    parse_uuid, CatalogRepository, RepoError, RepoResult, SqliteCatalogRepository,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const VOTE_SELECT_SQL: &str = "SELECT id, item_id, archetype_id, user_id, vote_value
FROM archetype_votes";

/// Repository interface for archetype votes and totals.
pub trait VoteRepository {
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn get_archetype(&self, id: ArchetypeId) -> RepoResult<Option<Archetype>>;
    fn find_archetype_by_name(&self, name: &str) -> RepoResult<Option<Archetype>>;
    /// Lists every live vote cast on one item.
    fn list_votes_for_item(&self, item_id: ItemId) -> RepoResult<Vec<Vote>>;
    fn find_vote(
        &self,
        item_id: ItemId,
        archetype_id: ArchetypeId,
        user_id: &str,
    ) -> RepoResult<Option<Vote>>;
    /// Inserts or replaces the user's vote and applies the delta to the total.
    fn record_vote(&mut self, vote: &Vote) -> RepoResult<VoteWrite>;
    /// Aggregated total for (item, archetype); `0` when no record exists.
    fn total_for(&self, item_id: ItemId, archetype_id: ArchetypeId) -> RepoResult<i64>;
    /// Archetypes with a positive total, excluding the item's primary one.
    fn list_secondary_archetypes(&self, item_id: ItemId)
        -> RepoResult<Vec<NamedSecondaryArchetype>>;
}

/// SQLite-backed vote repository.
pub struct SqliteVoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteVoteRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    fn catalog(&self) -> SqliteCatalogRepository<'_> {
        SqliteCatalogRepository::new(self.conn)
    }
}

impl VoteRepository for SqliteVoteRepository<'_> {
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        self.catalog().get_item(id)
    }

    fn get_archetype(&self, id: ArchetypeId) -> RepoResult<Option<Archetype>> {
        self.catalog().get_archetype(id)
    }

    fn find_archetype_by_name(&self, name: &str) -> RepoResult<Option<Archetype>> {
        self.catalog().find_archetype_by_name(name)
    }

    fn list_votes_for_item(&self, item_id: ItemId) -> RepoResult<Vec<Vote>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VOTE_SELECT_SQL} WHERE item_id = ?1 ORDER BY archetype_id ASC, user_id ASC;"
        ))?;
        let mut rows = stmt.query([item_id])?;
        let mut votes = Vec::new();
        while let Some(row) = rows.next()? {
            votes.push(parse_vote_row(row)?);
        }
        Ok(votes)
    }

    fn find_vote(
        &self,
        item_id: ItemId,
        archetype_id: ArchetypeId,
        user_id: &str,
    ) -> RepoResult<Option<Vote>> {
        find_vote_with(self.conn, item_id, archetype_id, user_id)
    }

    fn record_vote(&mut self, vote: &Vote) -> RepoResult<VoteWrite> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_vote_targets_exist(&tx, vote)?;

        let archetype_id = vote.archetype_id.to_string();
        let (write, delta) =
            match find_vote_with(&tx, vote.item_id, vote.archetype_id, &vote.user_id)? {
                Some(existing) if existing.value == vote.value => {
                    return Ok(VoteWrite::Unchanged);
                }
                Some(existing) => {
                    tx.execute(
                        "UPDATE archetype_votes
                         SET
                            vote_value = ?2,
                            updated_at = (strftime('%s', 'now') * 1000)
                         WHERE id = ?1;",
                        params![existing.id.to_string(), vote.value],
                    )?;
                    (
                        VoteWrite::Updated {
                            old_value: existing.value,
                        },
                        i64::from(vote.value) - i64::from(existing.value),
                    )
                }
                None => {
                    tx.execute(
                        "INSERT INTO archetype_votes (
                            id,
                            item_id,
                            archetype_id,
                            user_id,
                            vote_value
                        ) VALUES (?1, ?2, ?3, ?4, ?5);",
                        params![
                            vote.id.to_string(),
                            vote.item_id,
                            archetype_id.as_str(),
                            vote.user_id.as_str(),
                            vote.value,
                        ],
                    )?;
                    (VoteWrite::Created, i64::from(vote.value))
                }
            };

        tx.execute(
            "INSERT INTO item_archetype_totals (item_id, archetype_id, vote_count)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id, archetype_id) DO UPDATE SET
                vote_count = vote_count + excluded.vote_count,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![vote.item_id, archetype_id.as_str(), delta],
        )?;

        tx.commit()?;
        Ok(write)
    }

    fn total_for(&self, item_id: ItemId, archetype_id: ArchetypeId) -> RepoResult<i64> {
        let total: Option<i64> = self
            .conn
            .query_row(
                "SELECT vote_count
                 FROM item_archetype_totals
                 WHERE item_id = ?1 AND archetype_id = ?2;",
                params![item_id, archetype_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(total.unwrap_or(0))
    }

    fn list_secondary_archetypes(
        &self,
        item_id: ItemId,
    ) -> RepoResult<Vec<NamedSecondaryArchetype>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.name, t.vote_count
             FROM item_archetype_totals t
             INNER JOIN archetypes a ON a.id = t.archetype_id
             INNER JOIN items i ON i.id = t.item_id
             WHERE t.item_id = ?1
               AND t.vote_count > 0
               AND (i.archetype IS NULL OR trim(i.archetype) <> a.name COLLATE NOCASE)
             ORDER BY t.vote_count DESC, a.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([item_id])?;
        let mut secondary = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            secondary.push(NamedSecondaryArchetype {
                archetype_id: parse_uuid(&id_text, "archetypes.id")?,
                name: row.get(1)?,
                weight: row.get(2)?,
            });
        }
        Ok(secondary)
    }
}

fn find_vote_with(
    conn: &Connection,
    item_id: ItemId,
    archetype_id: ArchetypeId,
    user_id: &str,
) -> RepoResult<Option<Vote>> {
    let mut stmt = conn.prepare(&format!(
        "{VOTE_SELECT_SQL}
         WHERE item_id = ?1
           AND archetype_id = ?2
           AND user_id = ?3;"
    ))?;
    let mut rows = stmt.query(params![item_id, archetype_id.to_string(), user_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_vote_row(row)?));
    }
    Ok(None)
}

fn ensure_vote_targets_exist(tx: &Transaction<'_>, vote: &Vote) -> RepoResult<()> {
    let item_exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
        [vote.item_id],
        |row| row.get(0),
    )?;
    if item_exists != 1 {
        return Err(RepoError::ItemNotFound(vote.item_id));
    }

    let archetype_exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM archetypes WHERE id = ?1);",
        [vote.archetype_id.to_string()],
        |row| row.get(0),
    )?;
    if archetype_exists != 1 {
        return Err(RepoError::ArchetypeNotFound(vote.archetype_id));
    }

    Ok(())
}

fn parse_vote_row(row: &Row<'_>) -> RepoResult<Vote> {
    let id_text: String = row.get("id")?;
    let archetype_text: String = row.get("archetype_id")?;
    Ok(Vote {
        id: parse_uuid(&id_text, "archetype_votes.id")?,
        item_id: row.get("item_id")?,
        archetype_id: parse_uuid(&archetype_text, "archetype_votes.archetype_id")?,
        user_id: row.get("user_id")?,
        value: row.get("vote_value")?,
    })
}
