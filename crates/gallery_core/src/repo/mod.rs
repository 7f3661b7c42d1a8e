//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the catalog, vote and story store contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Item writes enforce `Item::validate()` before persistence.
//! - Repository APIs return semantic errors (`ItemNotFound`,
//!   `DuplicateArchetype`) in addition to DB transport errors.

pub mod catalog_repo;
pub mod story_repo;
pub mod vote_repo;
