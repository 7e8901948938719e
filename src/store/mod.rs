//! Collaborators the orchestrator persists through
//!
//! - [`KeyValueCache`] / [`ValidationMemory`]: run-scoped memoization with TTLs
//! - [`ValidationRepository`]: durable validation records
//! - [`ArticleStore`]: the articles being validated
//!
//! In-memory implementations back tests and one-shot runs; [`JsonDirStore`]
//! keeps state on disk for the CLI.

mod articles;
mod cache;
mod error;
mod json_dir;
mod memory;
mod repository;

pub use articles::{ArticleStore, InMemoryArticleStore};
pub use cache::{InMemoryCache, KeyValueCache};
pub use error::{CacheError, PersistenceError};
pub use json_dir::JsonDirStore;
pub use memory::{
    article_index_key, outcome_key, plan_key, result_key, ValidationMemory, ARTICLE_INDEX_TTL,
    OUTCOME_TTL, PLAN_TTL, RESULT_TTL,
};
pub use repository::{
    InMemoryValidationRepository, ValidationFilter, ValidationPage, ValidationRepository,
    DEFAULT_PAGE_SIZE,
};
