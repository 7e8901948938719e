//! Persistence of validation outcomes

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::PersistenceError;
use crate::validation::{ValidationOutcome, ValidationStatus, ValidationType, ValidationUpdate};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFilter {
    pub article_id: Option<Uuid>,
    pub status: Option<ValidationStatus>,
    pub validation_type: Option<ValidationType>,
    pub offset: usize,
    pub limit: usize,
}

impl Default for ValidationFilter {
    fn default() -> Self {
        Self {
            article_id: None,
            status: None,
            validation_type: None,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ValidationFilter {
    pub fn for_article(article_id: Uuid) -> Self {
        Self {
            article_id: Some(article_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, outcome: &ValidationOutcome) -> bool {
        self.article_id.map_or(true, |id| outcome.article_id == id)
            && self.status.map_or(true, |s| outcome.status == s)
            && self
                .validation_type
                .map_or(true, |t| outcome.validation_type == t)
    }

    /// Filters, orders newest first and pages `outcomes`
    pub fn apply(&self, outcomes: impl IntoIterator<Item = ValidationOutcome>) -> ValidationPage {
        let mut matching: Vec<ValidationOutcome> =
            outcomes.into_iter().filter(|o| self.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        ValidationPage { items, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationPage {
    pub items: Vec<ValidationOutcome>,
    /// Matching records before paging
    pub total: usize,
}

#[async_trait]
pub trait ValidationRepository: Send + Sync {
    async fn create_validation(&self, outcome: &ValidationOutcome)
        -> Result<(), PersistenceError>;

    /// Applies `update` to the stored record and returns the new state
    async fn update_validation(
        &self,
        id: Uuid,
        update: ValidationUpdate,
    ) -> Result<ValidationOutcome, PersistenceError>;

    async fn get_validation(&self, id: Uuid) -> Result<Option<ValidationOutcome>, PersistenceError>;

    async fn list_validations(
        &self,
        filter: &ValidationFilter,
    ) -> Result<ValidationPage, PersistenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryValidationRepository {
    records: RwLock<HashMap<Uuid, ValidationOutcome>>,
}

impl InMemoryValidationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ValidationRepository for InMemoryValidationRepository {
    async fn create_validation(
        &self,
        outcome: &ValidationOutcome,
    ) -> Result<(), PersistenceError> {
        let mut records = self.records.write().await;
        if records.contains_key(&outcome.id) {
            return Err(PersistenceError::Conflict(outcome.id));
        }
        records.insert(outcome.id, outcome.clone());
        Ok(())
    }

    async fn update_validation(
        &self,
        id: Uuid,
        update: ValidationUpdate,
    ) -> Result<ValidationOutcome, PersistenceError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or(PersistenceError::ValidationNotFound(id))?;
        record.apply(update);
        Ok(record.clone())
    }

    async fn get_validation(&self, id: Uuid) -> Result<Option<ValidationOutcome>, PersistenceError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_validations(
        &self,
        filter: &ValidationFilter,
    ) -> Result<ValidationPage, PersistenceError> {
        let records = self.records.read().await;
        Ok(filter.apply(records.values().cloned()))
    }
}
