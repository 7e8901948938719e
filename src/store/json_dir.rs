//! File-backed stores: one JSON document per record
//!
//! Layout under the root directory:
//!
//! ```text
//! articles/<article-id>.json
//! validations/<run-id>.json
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::articles::ArticleStore;
use super::error::PersistenceError;
use super::repository::{ValidationFilter, ValidationPage, ValidationRepository};
use crate::article::Article;
use crate::validation::{ValidationOutcome, ValidationUpdate};

const ARTICLES_DIR: &str = "articles";
const VALIDATIONS_DIR: &str = "validations";

#[derive(Debug)]
pub struct JsonDirStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on validation records
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Opens the store, creating the directory layout if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        for dir in [ARTICLES_DIR, VALIDATIONS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path)
                .await
                .map_err(|source| PersistenceError::Io { path, source })?;
        }
        debug!("Opened JSON store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn article_path(&self, id: Uuid) -> PathBuf {
        self.root.join(ARTICLES_DIR).join(format!("{}.json", id))
    }

    fn validation_path(&self, id: Uuid) -> PathBuf {
        self.root.join(VALIDATIONS_DIR).join(format!("{}.json", id))
    }

    async fn read_validation(&self, id: Uuid) -> Result<Option<ValidationOutcome>, PersistenceError> {
        read_json(&self.validation_path(id)).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| PersistenceError::Serialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes through a temp file and a rename so readers never see a partial document
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| {
        PersistenceError::Serialization {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json)
        .await
        .map_err(|source| PersistenceError::Io {
            path: temp_path.clone(),
            source,
        })?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl ArticleStore for JsonDirStore {
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, PersistenceError> {
        read_json(&self.article_path(id)).await
    }

    async fn put_article(&self, article: &Article) -> Result<(), PersistenceError> {
        write_json(&self.article_path(article.id), article).await
    }
}

#[async_trait]
impl ValidationRepository for JsonDirStore {
    async fn create_validation(
        &self,
        outcome: &ValidationOutcome,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let path = self.validation_path(outcome.id);
        let exists = fs::try_exists(&path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;
        if exists {
            return Err(PersistenceError::Conflict(outcome.id));
        }
        write_json(&path, outcome).await
    }

    async fn update_validation(
        &self,
        id: Uuid,
        update: ValidationUpdate,
    ) -> Result<ValidationOutcome, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut outcome = self
            .read_validation(id)
            .await?
            .ok_or(PersistenceError::ValidationNotFound(id))?;
        outcome.apply(update);
        write_json(&self.validation_path(id), &outcome).await?;
        Ok(outcome)
    }

    async fn get_validation(&self, id: Uuid) -> Result<Option<ValidationOutcome>, PersistenceError> {
        self.read_validation(id).await
    }

    async fn list_validations(
        &self,
        filter: &ValidationFilter,
    ) -> Result<ValidationPage, PersistenceError> {
        let dir = self.root.join(VALIDATIONS_DIR);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|source| PersistenceError::Io {
                path: dir.clone(),
                source,
            })?;

        let mut outcomes = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| PersistenceError::Io {
                    path: dir.clone(),
                    source,
                })?;
            let Some(entry) = entry else {
                break;
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(outcome) = read_json::<ValidationOutcome>(&path).await? {
                outcomes.push(outcome);
            }
        }

        Ok(filter.apply(outcomes))
    }
}
