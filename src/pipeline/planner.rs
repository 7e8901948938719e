//! Maps validation requests to plans through fixed templates

use tracing::info;

use super::error::PlanningError;
use super::plan::Plan;
use super::step::{
    BiasAnalysisParams, ConsistencyCheckParams, FactCheckParams, SourceVerificationParams, Step,
    StepKind, VerificationDepth,
};
use crate::validation::{ValidationRequest, ValidationType};

pub const FACT_CHECK_MODEL: &str = "gemini-pro";
pub const BIAS_ASPECTS: [&str; 3] = ["political", "corporate", "geopolitical"];
pub const CONSISTENCY_THRESHOLD: f64 = 0.8;

pub const SOURCE_VERIFICATION_STEP: &str = "source_verification";
pub const FACT_CHECKING_STEP: &str = "fact_checking";
pub const BIAS_ANALYSIS_STEP: &str = "bias_analysis";
pub const CONSISTENCY_CHECK_STEP: &str = "consistency_check";

/// Stateless: the same request always yields the same steps
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    pub fn create_plan(&self, request: &ValidationRequest) -> Result<Plan, PlanningError> {
        let steps = Self::template(request.validation_type);
        let plan = Plan::new(request.article_id, steps)?
            .with_context("request_id", request.request_id.to_string())
            .with_context("validation_type", request.validation_type.as_str())
            .with_context("priority", request.priority);

        info!(
            request_id = %request.request_id,
            validation_type = %request.validation_type,
            step_count = plan.len(),
            "Created validation plan"
        );

        Ok(plan)
    }

    /// Steps for a validation type, before graph validation
    pub fn template(validation_type: ValidationType) -> Vec<Step> {
        match validation_type {
            ValidationType::FactCheck => vec![fact_checking(15)],
            ValidationType::SourceVerification => {
                vec![source_verification(VerificationDepth::Standard)]
            }
            ValidationType::BiasAnalysis => vec![bias_analysis()],
            ValidationType::FullAnalysis => vec![
                source_verification(VerificationDepth::Thorough),
                fact_checking(10)
                    .with_priority(2)
                    .depends_on(SOURCE_VERIFICATION_STEP),
                bias_analysis()
                    .with_priority(2)
                    .depends_on(SOURCE_VERIFICATION_STEP),
                Step::new(
                    CONSISTENCY_CHECK_STEP,
                    StepKind::ConsistencyCheck(ConsistencyCheckParams {
                        threshold: CONSISTENCY_THRESHOLD,
                    }),
                )
                .with_priority(3)
                .depends_on(FACT_CHECKING_STEP)
                .depends_on(BIAS_ANALYSIS_STEP),
            ],
        }
    }
}

fn fact_checking(max_claims: usize) -> Step {
    Step::new(
        FACT_CHECKING_STEP,
        StepKind::FactCheck(FactCheckParams {
            model: FACT_CHECK_MODEL.to_string(),
            max_claims,
        }),
    )
}

fn source_verification(depth: VerificationDepth) -> Step {
    Step::new(
        SOURCE_VERIFICATION_STEP,
        StepKind::SourceVerification(SourceVerificationParams { depth }),
    )
}

fn bias_analysis() -> Step {
    Step::new(
        BIAS_ANALYSIS_STEP,
        StepKind::BiasAnalysis(BiasAnalysisParams {
            aspects: BIAS_ASPECTS.iter().map(|a| a.to_string()).collect(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::{StepType, DEFAULT_STEP_TIMEOUT};
    use uuid::Uuid;

    #[test]
    fn test_full_analysis_graph() {
        let request = ValidationRequest::new(Uuid::new_v4(), ValidationType::FullAnalysis);
        let plan = Planner::new().create_plan(&request).unwrap();

        let order: Vec<&str> = plan.execution_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                SOURCE_VERIFICATION_STEP,
                FACT_CHECKING_STEP,
                BIAS_ANALYSIS_STEP,
                CONSISTENCY_CHECK_STEP
            ]
        );

        let consistency = plan.step(CONSISTENCY_CHECK_STEP).unwrap();
        assert_eq!(consistency.priority, 3);
        assert!(consistency.dependencies.contains(FACT_CHECKING_STEP));
        assert!(consistency.dependencies.contains(BIAS_ANALYSIS_STEP));

        match &plan.step(SOURCE_VERIFICATION_STEP).unwrap().kind {
            StepKind::SourceVerification(params) => {
                assert_eq!(params.depth, VerificationDepth::Thorough)
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(plan.article_id(), request.article_id);
    }

    #[test]
    fn test_every_step_is_required_with_default_timeout() {
        for validation_type in ValidationType::ALL {
            for step in Planner::template(validation_type) {
                assert!(step.required, "{} should be required", step.id);
                assert_eq!(step.timeout, DEFAULT_STEP_TIMEOUT);
            }
        }
    }

    #[test]
    fn test_plan_context_records_request() {
        let request = ValidationRequest::new(Uuid::new_v4(), ValidationType::BiasAnalysis);
        let plan = Planner::new().create_plan(&request).unwrap();
        assert_eq!(
            plan.context()["request_id"],
            serde_json::json!(request.request_id.to_string())
        );
        assert_eq!(plan.steps()[0].step_type(), StepType::BiasAnalysis);
    }
}
