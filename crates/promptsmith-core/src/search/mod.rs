//! Tag-indexed corpus search.
//!
//! A search fragment such as `1girl, outdoors, ~rain` becomes a [`Query`]:
//! prompts must contain every include tag and none of the exclude tags.
//!
//! ```text
//!  Query ──▶ TagIndex ──▶ position table (u32 offsets per tag)
//!                               │  AND includes, subtract excludes
//!                               ▼
//!                        candidate offsets ──▶ corpus line at offset
//! ```
//!
//! - [`index`] maps tags to slot ranges and decodes position sets.
//! - [`resolver`] fetches and combines position sets, caching the last query.
//! - [`corpus`] reads one prompt line at a chosen offset.

pub mod corpus;
pub mod index;
pub mod query;
pub mod resolver;

pub use corpus::CorpusReader;
pub use index::{PositionSet, TagIndex, TagIndexEntry};
pub use query::Query;
pub use resolver::{QueryCache, QueryResolver};

use crate::source::FetchError;

/// Errors from resolving a search query.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("tag {0:?} not found")]
    TagNotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no prompts match the search tags")]
    NoMatches,

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("position fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Status callback invoked while a query resolves.
///
/// Called synchronously from the resolver, so it should return quickly.
pub type ProgressFn = dyn Fn(&str) + Send + Sync;
