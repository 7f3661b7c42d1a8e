//! Story repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A user likes one story at most once; repeated likes change nothing.
//! - Stories list oldest first.

use crate::model::item::ItemId;
use crate::model::story::{Story, StoryId};
use crate::repo::catalog_repo::{likes_from_db, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, TransactionBehavior};

const STORY_SELECT_SQL: &str = "SELECT id, item_id, body, likes, created_at FROM stories";

/// Repository interface for item stories.
pub trait StoryRepository {
    fn create_story(&self, story: &Story) -> RepoResult<Story>;
    fn get_story(&self, id: StoryId) -> RepoResult<Option<Story>>;
    fn list_stories(&self, item_id: ItemId) -> RepoResult<Vec<Story>>;
    /// Records one like per user. Returns `false` when already liked.
    fn like_story(&mut self, id: StoryId, user_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed story repository.
pub struct SqliteStoryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteStoryRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl StoryRepository for SqliteStoryRepository<'_> {
    fn create_story(&self, story: &Story) -> RepoResult<Story> {
        let item_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
            [story.item_id],
            |row| row.get(0),
        )?;
        if item_exists != 1 {
            return Err(RepoError::ItemNotFound(story.item_id));
        }

        self.conn.execute(
            "INSERT INTO stories (id, item_id, body) VALUES (?1, ?2, ?3);",
            params![story.id.to_string(), story.item_id, story.body.as_str()],
        )?;

        self.get_story(story.id)?
            .ok_or(RepoError::StoryNotFound(story.id))
    }

    fn get_story(&self, id: StoryId) -> RepoResult<Option<Story>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STORY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_story_row(row)?));
        }
        Ok(None)
    }

    fn list_stories(&self, item_id: ItemId) -> RepoResult<Vec<Story>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STORY_SELECT_SQL} WHERE item_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([item_id])?;
        let mut stories = Vec::new();
        while let Some(row) = rows.next()? {
            stories.push(parse_story_row(row)?);
        }
        Ok(stories)
    }

    fn like_story(&mut self, id: StoryId, user_id: &str) -> RepoResult<bool> {
        let story_id = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM stories WHERE id = ?1);",
            [story_id.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::StoryNotFound(id));
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO story_likes (story_id, user_id) VALUES (?1, ?2);",
            params![story_id.as_str(), user_id],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE stories SET likes = likes + 1 WHERE id = ?1;",
            [story_id.as_str()],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

fn parse_story_row(row: &Row<'_>) -> RepoResult<Story> {
    let id_text: String = row.get("id")?;
    Ok(Story {
        id: parse_uuid(&id_text, "stories.id")?,
        item_id: row.get("item_id")?,
        body: row.get("body")?,
        likes: likes_from_db(row.get("likes")?)?,
        created_at: row.get("created_at")?,
    })
}
