//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod aggregator;
pub mod catalog_service;
pub mod story_service;
pub mod vote_service;
