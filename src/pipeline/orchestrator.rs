//! Sequences planning, execution and scoring for one validation run
//!
//! The orchestrator is the only component with side effects: it reads the
//! article, persists the outcome at every lifecycle transition and memoizes the
//! plan and execution result by run id.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::cancel::CancellationSignal;
use super::error::PlanningError;
use super::executor::Executor;
use super::planner::Planner;
use super::result::{ExecutionResult, ExecutionStatus};
use super::scorer::{Score, Scorer};
use super::state::{InvalidTransition, Lifecycle, RunState};
use crate::store::{
    ArticleStore, CacheError, PersistenceError, ValidationFilter, ValidationMemory,
    ValidationPage, ValidationRepository,
};
use crate::validation::{ValidationOutcome, ValidationRequest, ValidationStatus, ValidationUpdate};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Article not found: {0}")]
    ArticleNotFound(Uuid),

    #[error("Validation not found: {0}")]
    ValidationNotFound(Uuid),

    #[error("Validation {id} cannot be retried from status {status}")]
    NotRetryable { id: Uuid, status: ValidationStatus },

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub struct ValidationOrchestrator {
    planner: Planner,
    executor: Executor,
    scorer: Scorer,
    articles: Arc<dyn ArticleStore>,
    repository: Arc<dyn ValidationRepository>,
    memory: ValidationMemory,
}

impl ValidationOrchestrator {
    pub fn new(
        executor: Executor,
        articles: Arc<dyn ArticleStore>,
        repository: Arc<dyn ValidationRepository>,
        memory: ValidationMemory,
    ) -> Self {
        Self {
            planner: Planner::new(),
            executor,
            scorer: Scorer::new(),
            articles,
            repository,
            memory,
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn memory(&self) -> &ValidationMemory {
        &self.memory
    }

    /// Parses untyped input and validates. Unknown types and priorities are
    /// rejected before anything is created.
    pub async fn submit(
        &self,
        article_id: Uuid,
        validation_type: &str,
        priority: Option<u8>,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let request = ValidationRequest::parse(article_id, validation_type, priority)?;
        self.validate(request).await
    }

    pub async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        self.validate_with_cancel(request, &CancellationSignal::new())
            .await
    }

    /// Runs one validation to a terminal state.
    ///
    /// A missing article or a failure to create the pending record is returned
    /// as an error. Everything after that ends in a persisted outcome, `failed`
    /// when planning, caching or a required step went wrong.
    pub async fn validate_with_cancel(
        &self,
        request: ValidationRequest,
        cancel: &CancellationSignal,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let outcome = ValidationOutcome::pending(&request);
        self.run(request, outcome, cancel).await
    }

    /// Re-runs a failed validation under a new run id
    pub async fn retry_validation(
        &self,
        run_id: Uuid,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let previous = self.get_validation(run_id).await?;
        if previous.status != ValidationStatus::Failed {
            return Err(OrchestratorError::NotRetryable {
                id: run_id,
                status: previous.status,
            });
        }

        let request = previous.request().retry();
        info!(run_id = %run_id, request_id = %request.request_id, "Retrying validation");
        let outcome = ValidationOutcome::pending(&request).with_retry_of(run_id);
        self.run(request, outcome, &CancellationSignal::new()).await
    }

    pub async fn get_validation(&self, run_id: Uuid) -> Result<ValidationOutcome, OrchestratorError> {
        self.repository
            .get_validation(run_id)
            .await?
            .ok_or(OrchestratorError::ValidationNotFound(run_id))
    }

    pub async fn list_validations(
        &self,
        filter: &ValidationFilter,
    ) -> Result<ValidationPage, OrchestratorError> {
        Ok(self.repository.list_validations(filter).await?)
    }

    /// Run ids recorded for an article in the cache index
    pub async fn article_runs(&self, article_id: Uuid) -> Result<Vec<Uuid>, OrchestratorError> {
        Ok(self.memory.article_runs(article_id).await?)
    }

    async fn run(
        &self,
        request: ValidationRequest,
        outcome: ValidationOutcome,
        cancel: &CancellationSignal,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let start = Instant::now();
        let run_id = outcome.id;

        let article = self
            .articles
            .get_article(request.article_id)
            .await?
            .ok_or(OrchestratorError::ArticleNotFound(request.article_id))?;

        info!(
            run_id = %run_id,
            request_id = %request.request_id,
            article_id = %request.article_id,
            validation_type = %request.validation_type,
            priority = request.priority,
            "Starting validation"
        );

        let mut lifecycle = Lifecycle::new(run_id);
        lifecycle.advance(RunState::Planning)?;
        self.repository.create_validation(&outcome).await?;
        self.mirror(&outcome).await;

        let plan = match self.planner.create_plan(&request) {
            Ok(plan) => plan,
            Err(e) => return Ok(self.fail(&mut lifecycle, outcome, e.to_string(), None, None).await),
        };
        if let Err(e) = self.memory.store_plan(run_id, &plan).await {
            return Ok(self.fail(&mut lifecycle, outcome, e.to_string(), None, None).await);
        }

        lifecycle.advance(RunState::Executing)?;
        let outcome = match self
            .repository
            .update_validation(run_id, ValidationUpdate::status(ValidationStatus::InProgress))
            .await
        {
            Ok(updated) => updated,
            Err(e) => return Ok(self.fail(&mut lifecycle, outcome, e.to_string(), None, None).await),
        };
        self.mirror(&outcome).await;

        let execution = self
            .executor
            .execute_with_cancel(&plan, &article, cancel)
            .await;
        let score = self.scorer.score(&execution);

        if let Err(e) = self.memory.store_result(run_id, &execution).await {
            return Ok(self
                .fail(&mut lifecycle, outcome, e.to_string(), Some(execution), Some(score))
                .await);
        }

        if execution.status() != ExecutionStatus::Completed {
            let error = execution
                .error()
                .unwrap_or("Validation execution failed")
                .to_string();
            return Ok(self
                .fail(&mut lifecycle, outcome, error, Some(execution), Some(score))
                .await);
        }

        lifecycle.advance(RunState::Completed)?;
        let update = ValidationUpdate::status(ValidationStatus::Completed)
            .with_score(&score)
            .with_execution(execution);
        let outcome = self.repository.update_validation(run_id, update).await?;
        self.mirror(&outcome).await;

        info!(
            run_id = %run_id,
            status = %outcome.status,
            confidence = score.confidence,
            is_credible = score.is_credible,
            duration_ms = start.elapsed().as_millis() as u64,
            "Validation completed"
        );

        Ok(outcome)
    }

    /// Moves the run to `failed` and persists that. Persistence errors here are
    /// logged and the locally updated outcome is returned.
    async fn fail(
        &self,
        lifecycle: &mut Lifecycle,
        mut outcome: ValidationOutcome,
        error: String,
        execution: Option<ExecutionResult>,
        score: Option<Score>,
    ) -> ValidationOutcome {
        if let Err(e) = lifecycle.advance(RunState::Failed) {
            warn!(run_id = %outcome.id, error = %e, "Unexpected lifecycle state");
        }

        let mut update = ValidationUpdate::status(ValidationStatus::Failed).with_error(error.clone());
        if let Some(score) = &score {
            update = update.with_score(score);
        }
        if let Some(execution) = execution {
            update = update.with_execution(execution);
        }

        match self
            .repository
            .update_validation(outcome.id, update.clone())
            .await
        {
            Ok(stored) => outcome = stored,
            Err(e) => {
                warn!(run_id = %outcome.id, error = %e, "Failed to persist failed validation");
                outcome.apply(update);
            }
        }
        self.mirror(&outcome).await;

        warn!(run_id = %outcome.id, error = %error, "Validation failed");
        outcome
    }

    /// Best-effort copy of the outcome into the cache
    async fn mirror(&self, outcome: &ValidationOutcome) {
        if let Err(e) = self.memory.store_outcome(outcome).await {
            warn!(run_id = %outcome.id, error = %e, "Failed to cache validation outcome");
        }
        if let Err(e) = self.memory.index_run(outcome.article_id, outcome.id).await {
            warn!(run_id = %outcome.id, error = %e, "Failed to index validation run");
        }
    }
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
