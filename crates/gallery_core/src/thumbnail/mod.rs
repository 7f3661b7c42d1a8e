//! Thumbnail path resolution.
//!
//! # Responsibility
//! - Derive ordered candidate thumbnail paths for an item.
//! - Probe candidates one at a time and settle on the first loadable one,
//!   or on the placeholder when none loads.
//!
//! # Invariants
//! - Candidate lists contain no duplicate paths.
//! - A resolver has at most one probe in flight and always terminates in a
//!   resolved path or the fallback.

pub mod candidates;
pub mod probe;
pub mod resolver;
