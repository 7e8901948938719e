//! Persisted validation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::request::{ValidationRequest, ValidationType};
use crate::pipeline::{ExecutionResult, ExecutionStatus, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::InProgress => "in_progress",
            ValidationStatus::Completed => "completed",
            ValidationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationStatus::Completed | ValidationStatus::Failed)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ValidationStatus::Pending),
            "in_progress" => Ok(ValidationStatus::InProgress),
            "completed" => Ok(ValidationStatus::Completed),
            "failed" => Ok(ValidationStatus::Failed),
            other => Err(format!(
                "Unknown validation status '{}'. Valid values: pending, in_progress, completed, failed",
                other
            )),
        }
    }
}

impl From<ExecutionStatus> for ValidationStatus {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Pending => ValidationStatus::Pending,
            ExecutionStatus::InProgress => ValidationStatus::InProgress,
            ExecutionStatus::Completed => ValidationStatus::Completed,
            ExecutionStatus::Failed => ValidationStatus::Failed,
        }
    }
}

/// One validation run of one article, as stored and returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Run id
    pub id: Uuid,
    pub request_id: Uuid,
    pub article_id: Uuid,
    pub validation_type: ValidationType,
    pub priority: u8,
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_credible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Audit trail of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Run this one retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ValidationOutcome {
    /// Placeholder record for a run that has not started yet
    pub fn pending(request: &ValidationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id: request.request_id,
            article_id: request.article_id,
            validation_type: request.validation_type,
            priority: request.priority,
            status: ValidationStatus::Pending,
            summary: None,
            overall_confidence: None,
            is_credible: None,
            error: None,
            execution: None,
            metadata: request.metadata.clone(),
            retry_of: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_retry_of(mut self, previous: Uuid) -> Self {
        self.retry_of = Some(previous);
        self
    }

    /// Applies the `Some` fields of `update`; always bumps `updated_at`
    pub fn apply(&mut self, update: ValidationUpdate) {
        let now = Utc::now();
        if let Some(status) = update.status {
            if status == ValidationStatus::Completed && self.status != ValidationStatus::Completed
            {
                self.completed_at = Some(now);
            }
            self.status = status;
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        if let Some(confidence) = update.overall_confidence {
            self.overall_confidence = Some(confidence);
        }
        if let Some(credible) = update.is_credible {
            self.is_credible = Some(credible);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(execution) = update.execution {
            self.execution = Some(execution);
        }
        self.updated_at = now;
    }

    /// Rebuilds the request this run was created from
    pub fn request(&self) -> ValidationRequest {
        ValidationRequest {
            request_id: self.request_id,
            article_id: self.article_id,
            validation_type: self.validation_type,
            priority: self.priority,
            metadata: self.metadata.clone(),
        }
    }
}

/// Partial update of a [`ValidationOutcome`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationUpdate {
    pub status: Option<ValidationStatus>,
    pub summary: Option<String>,
    pub overall_confidence: Option<f64>,
    pub is_credible: Option<bool>,
    pub error: Option<String>,
    pub execution: Option<ExecutionResult>,
}

impl ValidationUpdate {
    pub fn status(status: ValidationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: &Score) -> Self {
        self.summary = Some(score.summary.clone());
        self.overall_confidence = Some(score.confidence);
        self.is_credible = Some(score.is_credible);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_execution(mut self, execution: ExecutionResult) -> Self {
        self.execution = Some(execution);
        self
    }
}
