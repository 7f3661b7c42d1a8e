//! Catalog seed import.
//!
//! # Responsibility
//! - Load a JSON seed document of archetype names and gallery items.
//! - Write it into the catalog idempotently inside one transaction.
//!
//! # Invariants
//! - Re-importing the same document changes nothing.
//! - Every distinct primary archetype referenced by an item exists in the
//!   catalog after import.

use crate::model::archetype::{normalize_archetype_name, Archetype};
use crate::model::item::Item;
use crate::repo::catalog_repo::{CatalogRepository, RepoError, SqliteCatalogRepository};
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Seed file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedDocument {
    pub archetypes: Vec<String>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub items_upserted: usize,
    pub archetypes_created: usize,
    pub archetypes_existing: usize,
}

#[derive(Debug)]
pub enum SeedError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Repo(RepoError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read seed file {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid seed document: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<RepoError> for SeedError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Imports a parsed seed document.
pub fn import_seed(conn: &mut Connection, document: &SeedDocument) -> Result<SeedReport, SeedError> {
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut report = SeedReport::default();
    {
        let repo = SqliteCatalogRepository::new(&tx);

        let names = document
            .archetypes
            .iter()
            .map(String::as_str)
            .chain(document.items.iter().filter_map(Item::primary_archetype))
            .filter_map(normalize_archetype_name);
        for name in names {
            match repo.create_archetype(&Archetype::new(name)) {
                Ok(_) => report.archetypes_created += 1,
                Err(RepoError::DuplicateArchetype(_)) => report.archetypes_existing += 1,
                Err(err) => return Err(err.into()),
            }
        }

        for item in &document.items {
            repo.upsert_item(item)?;
            report.items_upserted += 1;
        }
    }
    tx.commit()?;

    info!(
        "event=seed_import module=seed status=ok items={} archetypes_created={} duration_ms={}",
        report.items_upserted,
        report.archetypes_created,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

pub fn import_seed_json(conn: &mut Connection, text: &str) -> Result<SeedReport, SeedError> {
    let document: SeedDocument = serde_json::from_str(text)?;
    import_seed(conn, &document)
}

pub fn import_seed_file(
    conn: &mut Connection,
    path: impl AsRef<Path>,
) -> Result<SeedReport, SeedError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_seed_json(conn, &text)
}
