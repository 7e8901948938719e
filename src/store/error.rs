use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value that no longer decodes. Never reported as a miss.
    #[error("Failed to decode cached value for {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Key {0} holds a different kind of value")]
    WrongType(String),

    #[error("Set {key} contains an invalid member: {member}")]
    InvalidMember { key: String, member: String },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Validation not found: {0}")]
    ValidationNotFound(Uuid),

    #[error("Article not found: {0}")]
    ArticleNotFound(Uuid),

    #[error("Record already exists: {0}")]
    Conflict(Uuid),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Persistence backend error: {0}")]
    Backend(String),
}
