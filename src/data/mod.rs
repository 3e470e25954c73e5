//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Post query descriptors for search

mod database;
mod models;
mod query;

pub use database::Database;
pub use models::*;
pub use query::{MAX_PAGE, PAGE_SIZE, PostPredicate, PostQuery, clamp_page, contains_pattern, has_more};
