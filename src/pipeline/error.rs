//! Error types for planning, execution and scoring

use crate::llm::BackendError;
use std::time::Duration;
use thiserror::Error;

use super::step::StepType;

/// Errors raised while turning a request into a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("Unknown validation type: {0}")]
    UnknownValidationType(String),

    #[error("Invalid priority {0}: expected a value from 1 to 5")]
    InvalidPriority(u8),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Cyclic dependency between steps: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
}

/// Failure of a single step. Recorded inside the step result, never raised past the executor.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("Unknown step type: no handler registered for {0}")]
    UnknownStepType(StepType),

    #[error("Step timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Handler for {handler} cannot run a {step} step")]
    WrongStepKind { handler: StepType, step: StepType },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Consistency check failed: score {score:.2} is below threshold {threshold:.2}")]
    ConsistencyFailed { score: f64, threshold: f64 },
}

/// Errors at the execution-result level
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Execution result is already finalized")]
    AlreadyFinalized,

    #[error("Validation run cancelled")]
    Cancelled,
}

/// A step payload that cannot contribute to the confidence score
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} value {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },
}

impl ScoringError {
    /// Checks that a scorable field is a finite value in [0, 1]
    pub fn check_unit(field: &'static str, value: f64) -> Result<f64, ScoringError> {
        if !value.is_finite() {
            return Err(ScoringError::NonFinite { field });
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScoringError::OutOfRange { field, value });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_steps() {
        let err = PlanningError::CyclicDependency(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Cyclic dependency between steps: a, b");
    }

    #[test]
    fn test_timeout_message() {
        let err = StepError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_check_unit() {
        assert_eq!(ScoringError::check_unit("confidence", 0.4), Ok(0.4));
        assert!(matches!(
            ScoringError::check_unit("confidence", 1.5),
            Err(ScoringError::OutOfRange { .. })
        ));
        assert!(matches!(
            ScoringError::check_unit("bias_score", f64::NAN),
            Err(ScoringError::NonFinite { .. })
        ));
    }
}
