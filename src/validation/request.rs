//! Validation requests as they enter the pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::pipeline::PlanningError;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;
pub const DEFAULT_PRIORITY: u8 = MIN_PRIORITY;

/// What kind of validation the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    FactCheck,
    SourceVerification,
    BiasAnalysis,
    FullAnalysis,
}

impl ValidationType {
    pub const ALL: [ValidationType; 4] = [
        ValidationType::FactCheck,
        ValidationType::SourceVerification,
        ValidationType::BiasAnalysis,
        ValidationType::FullAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::FactCheck => "fact_check",
            ValidationType::SourceVerification => "source_verification",
            ValidationType::BiasAnalysis => "bias_analysis",
            ValidationType::FullAnalysis => "full_analysis",
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationType {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| PlanningError::UnknownValidationType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub request_id: Uuid,
    pub article_id: Uuid,
    pub validation_type: ValidationType,
    /// 1 (lowest) to 5 (highest). Recorded on the outcome; does not reorder steps.
    pub priority: u8,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ValidationRequest {
    pub fn new(article_id: Uuid, validation_type: ValidationType) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            article_id,
            validation_type,
            priority: DEFAULT_PRIORITY,
            metadata: BTreeMap::new(),
        }
    }

    /// Builds a request from untyped input, rejecting unknown types and priorities
    /// before any run exists
    pub fn parse(
        article_id: Uuid,
        validation_type: &str,
        priority: Option<u8>,
    ) -> Result<Self, PlanningError> {
        let request = Self::new(article_id, validation_type.parse()?);
        match priority {
            Some(p) => request.with_priority(p),
            None => Ok(request),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Result<Self, PlanningError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(PlanningError::InvalidPriority(priority));
        }
        self.priority = priority;
        Ok(self)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A fresh request for the same work, with a new request id
    pub fn retry(&self) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            ..self.clone()
        }
    }
}
