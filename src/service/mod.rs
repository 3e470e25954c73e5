//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database access for auth, ingestion and search.

mod auth;
mod ingest;
mod search;

pub use auth::{AuthService, IssuedSession};
pub use ingest::{
    DEFAULT_LANG, DEFAULT_TOPIC_LABEL, IngestReport, IngestService, PostInput, parse_batch,
    sample_batch,
};
pub use search::{SearchFilters, SearchPage, SearchService, end_of_day, start_of_day};
