//! Typed key families on top of a [`KeyValueCache`]

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::cache::KeyValueCache;
use super::error::CacheError;
use crate::pipeline::{ExecutionResult, Plan};
use crate::validation::ValidationOutcome;

const DAY: u64 = 24 * 60 * 60;

pub const PLAN_TTL: Duration = Duration::from_secs(DAY);
pub const RESULT_TTL: Duration = Duration::from_secs(7 * DAY);
pub const OUTCOME_TTL: Duration = Duration::from_secs(7 * DAY);
pub const ARTICLE_INDEX_TTL: Duration = Duration::from_secs(30 * DAY);

pub fn plan_key(run_id: Uuid) -> String {
    format!("execution:plan:{}", run_id)
}

pub fn result_key(run_id: Uuid) -> String {
    format!("execution:result:{}", run_id)
}

pub fn outcome_key(run_id: Uuid) -> String {
    format!("validation:result:{}", run_id)
}

pub fn article_index_key(article_id: Uuid) -> String {
    format!("article:validations:{}", article_id)
}

/// Run-scoped memoization of plans, execution results and outcomes.
///
/// Plans and execution results are written at most once per run id.
#[derive(Clone)]
pub struct ValidationMemory {
    cache: Arc<dyn KeyValueCache>,
}

impl ValidationMemory {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    pub async fn store_plan(&self, run_id: Uuid, plan: &Plan) -> Result<(), CacheError> {
        self.put_once(&plan_key(run_id), plan, PLAN_TTL).await
    }

    pub async fn load_plan(&self, run_id: Uuid) -> Result<Option<Plan>, CacheError> {
        self.load(&plan_key(run_id)).await
    }

    pub async fn store_result(
        &self,
        run_id: Uuid,
        result: &ExecutionResult,
    ) -> Result<(), CacheError> {
        self.put_once(&result_key(run_id), result, RESULT_TTL).await
    }

    pub async fn load_result(&self, run_id: Uuid) -> Result<Option<ExecutionResult>, CacheError> {
        self.load(&result_key(run_id)).await
    }

    /// Mirrors the latest state of an outcome; overwrites earlier states
    pub async fn store_outcome(&self, outcome: &ValidationOutcome) -> Result<(), CacheError> {
        let key = outcome_key(outcome.id);
        let value = encode(&key, outcome)?;
        self.cache.put(&key, value, OUTCOME_TTL).await
    }

    pub async fn load_outcome(
        &self,
        run_id: Uuid,
    ) -> Result<Option<ValidationOutcome>, CacheError> {
        self.load(&outcome_key(run_id)).await
    }

    pub async fn index_run(&self, article_id: Uuid, run_id: Uuid) -> Result<(), CacheError> {
        self.cache
            .add_to_set(
                &article_index_key(article_id),
                &run_id.to_string(),
                ARTICLE_INDEX_TTL,
            )
            .await
    }

    pub async fn article_runs(&self, article_id: Uuid) -> Result<Vec<Uuid>, CacheError> {
        let key = article_index_key(article_id);
        self.cache
            .set_members(&key)
            .await?
            .into_iter()
            .map(|member| {
                member
                    .parse::<Uuid>()
                    .map_err(|_| CacheError::InvalidMember {
                        key: key.clone(),
                        member,
                    })
            })
            .collect()
    }

    async fn put_once<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let encoded = encode(key, value)?;
        if self.cache.put_if_absent(key, encoded, ttl).await? {
            Ok(())
        } else {
            Err(CacheError::AlreadyExists(key.to_string()))
        }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.cache.get(key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| CacheError::Decode {
                    key: key.to_string(),
                    source,
                }),
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, CacheError> {
    serde_json::to_string(value).map_err(|source| CacheError::Encode {
        key: key.to_string(),
        source,
    })
}

impl std::fmt::Debug for ValidationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationMemory").finish_non_exhaustive()
    }
}
