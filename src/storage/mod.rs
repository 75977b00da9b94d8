//! SQLite storage layer for kicksync.
//!
//! This module provides the on-device persistence:
//! - A shared, lazily opened connection handle
//! - Versioned migrations applied exactly once
//! - One store per synchronized domain, all written through insert-or-replace
//! - A TTL-bound content cache
//! - Per-domain sync state
//!
//! # Submodules
//!
//! - [`database`] - Connection handle and single-flight initialization
//! - [`migrations`] - Embedded schema migrations
//! - [`profile`], [`kicks`], [`symptoms`], [`goals`] - Domain stores
//! - [`content`] - Article and tip cache
//! - [`sync_state`] - Last success / last error per domain

pub mod content;
pub mod database;
pub mod goals;
pub mod kicks;
pub mod migrations;
pub mod profile;
mod rows;
pub mod symptoms;
pub mod sync_state;

pub use content::{CachedItem, ContentCache, ContentFilter, DEFAULT_CONTENT_TTL};
pub use database::Database;
pub use goals::GoalStore;
pub use kicks::{KickFilter, KickStore};
pub use profile::ProfileStore;
pub use symptoms::SymptomStore;
pub use sync_state::SyncStateTracker;
