//! Step and execution results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::error::{ExecutionError, StepError};
use super::payload::StepPayload;
use super::plan::Plan;
use super::step::{duration_ms, Step, StepType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    TimedOut,
    /// Never started because a required prerequisite failed or the run was cancelled
    Skipped,
    /// Interrupted while running
    Cancelled,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::TimedOut => "timed_out",
            StepStatus::Skipped => "skipped",
            StepStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub validation_type: StepType,
    #[serde(default = "default_required")]
    pub required: bool,
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_due_to: Option<String>,
}

fn default_required() -> bool {
    true
}

impl StepMetadata {
    fn of(step: &Step) -> Self {
        Self {
            validation_type: step.step_type(),
            required: step.required,
            priority: step.priority,
            skipped_due_to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub metadata: StepMetadata,
}

impl StepResult {
    pub fn succeeded(step: &Step, payload: StepPayload, duration: Duration) -> Self {
        Self {
            step_id: step.id.clone(),
            status: StepStatus::Succeeded,
            result: Some(payload),
            error: None,
            duration,
            metadata: StepMetadata::of(step),
        }
    }

    pub fn failed(step: &Step, error: &StepError, duration: Duration) -> Self {
        let status = match error {
            StepError::Timeout(_) => StepStatus::TimedOut,
            _ => StepStatus::Failed,
        };
        Self {
            step_id: step.id.clone(),
            status,
            result: None,
            error: Some(error.to_string()),
            duration,
            metadata: StepMetadata::of(step),
        }
    }

    /// Result for a step whose required prerequisite failed
    pub fn skipped(step: &Step, prerequisite: &str) -> Self {
        let mut metadata = StepMetadata::of(step);
        metadata.skipped_due_to = Some(prerequisite.to_string());
        Self {
            step_id: step.id.clone(),
            status: StepStatus::Skipped,
            result: None,
            error: Some(format!("Skipped: required step {} failed", prerequisite)),
            duration: Duration::ZERO,
            metadata,
        }
    }

    /// Result for a step that never started before the run was cancelled
    pub fn not_started(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            status: StepStatus::Skipped,
            result: None,
            error: Some(format!("Skipped: {}", ExecutionError::Cancelled)),
            duration: Duration::ZERO,
            metadata: StepMetadata::of(step),
        }
    }

    pub fn cancelled(step: &Step, duration: Duration) -> Self {
        Self {
            step_id: step.id.clone(),
            status: StepStatus::Cancelled,
            result: None,
            error: Some(ExecutionError::Cancelled.to_string()),
            duration,
            metadata: StepMetadata::of(step),
        }
    }

    pub fn success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }

    pub fn is_required(&self) -> bool {
        self.metadata.required
    }

    pub fn step_type(&self) -> StepType {
        self.metadata.validation_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Outcome of running one plan.
///
/// Step results are appended while the run is in flight. [`finalize`](Self::finalize)
/// or [`abort`](Self::abort) sorts them by step id, fixes the status and seals the
/// result; later mutation attempts fail with [`ExecutionError::AlreadyFinalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    execution_id: Uuid,
    plan_id: Uuid,
    article_id: Uuid,
    status: ExecutionStatus,
    steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl ExecutionResult {
    pub fn for_plan(plan: &Plan) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            plan_id: plan.id(),
            article_id: plan.article_id(),
            status: ExecutionStatus::Pending,
            steps: Vec::with_capacity(plan.len()),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.status = ExecutionStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn record(&mut self, result: StepResult) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.steps.push(result);
        Ok(())
    }

    /// Seals the result. The run fails if any required step did not succeed.
    pub fn finalize(&mut self) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.steps.sort_by(|a, b| a.step_id.cmp(&b.step_id));

        let required_failures: Vec<&StepResult> = self
            .steps
            .iter()
            .filter(|r| r.is_required() && !r.success())
            .collect();

        if required_failures.is_empty() {
            self.status = ExecutionStatus::Completed;
        } else {
            // Report the root cause rather than a downstream skip
            let cause = required_failures
                .iter()
                .find(|r| r.status != StepStatus::Skipped)
                .or_else(|| required_failures.first())
                .map(|r| {
                    format!(
                        "Required step {} failed: {}",
                        r.step_id,
                        r.error.as_deref().unwrap_or("unknown error")
                    )
                });
            self.status = ExecutionStatus::Failed;
            self.error = cause;
        }

        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Seals the result as failed with a run-level error, keeping recorded steps
    pub fn abort(&mut self, error: ExecutionError) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.steps.sort_by(|a, b| a.step_id.cmp(&b.step_id));
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.to_string());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ExecutionError> {
        if self.finished_at.is_some() {
            return Err(ExecutionError::AlreadyFinalized);
        }
        Ok(())
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn article_id(&self) -> Uuid {
        self.article_id
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.step_id == step_id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn successful_steps(&self) -> usize {
        self.steps.iter().filter(|r| r.success()).count()
    }
}
