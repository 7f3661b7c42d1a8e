//! Gallery domain model.
//!
//! # Responsibility
//! - Define the catalog records (items, archetypes, stories).
//! - Define vote records and the derived tally shapes.
//!
//! # Invariants
//! - Items are identified by a stable numeric id and never deleted.
//! - Archetype names are unique case-insensitively.

pub mod archetype;
pub mod item;
pub mod story;
pub mod vote;
