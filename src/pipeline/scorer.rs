//! Reduces an execution result to a confidence score, a credibility verdict and a summary

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::payload::StepPayload;
use super::result::{ExecutionResult, StepResult};

/// Minimum confidence for an article to be considered credible
pub const CREDIBILITY_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub summary: String,
    pub confidence: f64,
    pub is_credible: bool,
}

/// Stateless; scoring the same result twice yields the same score
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, result: &ExecutionResult) -> Score {
        let confidence = self.confidence(result);
        Score {
            summary: self.summarize_with(result, confidence),
            confidence,
            is_credible: self.is_credible_with(result, confidence),
        }
    }

    /// Mean of the per-step contributions of successful steps.
    ///
    /// Falls back to the share of successful steps when nothing contributed,
    /// and to 0.0 for an empty result.
    pub fn confidence(&self, result: &ExecutionResult) -> f64 {
        let steps = result.steps();
        if steps.is_empty() {
            return 0.0;
        }

        let contributions: Vec<f64> = steps
            .iter()
            .filter(|r| r.success())
            .filter_map(|r| contribution(r))
            .collect();

        let confidence = if contributions.is_empty() {
            result.successful_steps() as f64 / steps.len() as f64
        } else {
            contributions.iter().sum::<f64>() / contributions.len() as f64
        };

        confidence.clamp(0.0, 1.0)
    }

    pub fn is_credible(&self, result: &ExecutionResult) -> bool {
        self.is_credible_with(result, self.confidence(result))
    }

    fn is_credible_with(&self, result: &ExecutionResult, confidence: f64) -> bool {
        let steps = result.steps();
        if steps.is_empty() {
            return false;
        }
        if steps.iter().any(|r| r.is_required() && !r.success()) {
            return false;
        }
        confidence >= CREDIBILITY_THRESHOLD
    }

    pub fn summarize(&self, result: &ExecutionResult) -> String {
        self.summarize_with(result, self.confidence(result))
    }

    fn summarize_with(&self, result: &ExecutionResult, confidence: f64) -> String {
        let steps = result.steps();
        if steps.is_empty() {
            return "No validation steps were executed.".to_string();
        }

        let mut lines = vec![
            format!(
                "Validation completed with {} of {} steps successful.",
                result.successful_steps(),
                steps.len()
            ),
            format!("Overall confidence: {:.1}%", confidence * 100.0),
        ];

        for step in steps.iter().filter(|r| r.success()) {
            if let Some(payload) = &step.result {
                lines.push(format!("- {}", step_line(step, payload)));
            }
        }

        lines.join("\n")
    }
}

fn contribution(step: &StepResult) -> Option<f64> {
    let payload = step.result.as_ref()?;
    match payload.confidence_contribution() {
        Ok(value) => value,
        Err(e) => {
            warn!(step_id = %step.step_id, error = %e, "Ignoring malformed payload value");
            None
        }
    }
}

fn step_line(step: &StepResult, payload: &StepPayload) -> String {
    match payload {
        StepPayload::FactCheck(report) => format!(
            "Fact-checking: {} claims supported, {} contradicted",
            report.claims_supported, report.claims_contradicted
        ),
        StepPayload::SourceVerification(report) => format!(
            "Source verification: {} reliable sources, {} questionable sources",
            report.reliable_sources, report.questionable_sources
        ),
        StepPayload::BiasAnalysis(report) => format!(
            "Bias analysis: Overall bias score {:.1} ({})",
            report.bias_score, report.bias_direction
        ),
        StepPayload::ConsistencyCheck(_) => {
            format!("{} completed successfully", step.step_type().display_name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::StepError;
    use crate::pipeline::payload::{
        BiasReport, ConsistencyReport, FactCheckReport, SourceReport,
    };
    use crate::pipeline::plan::Plan;
    use crate::pipeline::step::{ConsistencyCheckParams, Step, StepKind};
    use std::time::Duration;
    use uuid::Uuid;

    fn any_step(id: &str) -> Step {
        Step::new(
            id,
            StepKind::ConsistencyCheck(ConsistencyCheckParams { threshold: 0.8 }),
        )
    }

    fn result_with(steps: Vec<StepResult>) -> ExecutionResult {
        let plan = Plan::new(Uuid::new_v4(), Vec::new()).unwrap();
        let mut result = ExecutionResult::for_plan(&plan);
        result.start().unwrap();
        for step in steps {
            result.record(step).unwrap();
        }
        result.finalize().unwrap();
        result
    }

    fn ok(id: &str, payload: StepPayload) -> StepResult {
        StepResult::succeeded(&any_step(id), payload, Duration::from_millis(1))
    }

    #[test]
    fn test_empty_result() {
        let score = Scorer::new().score(&result_with(Vec::new()));
        assert_eq!(score.confidence, 0.0);
        assert!(!score.is_credible);
        assert_eq!(score.summary, "No validation steps were executed.");
    }

    #[test]
    fn test_mean_of_contributions() {
        let result = result_with(vec![
            ok("a", StepPayload::FactCheck(FactCheckReport::new(8, 2))),
            ok(
                "b",
                StepPayload::SourceVerification(SourceReport::new(3, 1).with_credibility_score(0.9)),
            ),
            ok("c", StepPayload::BiasAnalysis(BiasReport::new(0.5, "neutral"))),
        ]);
        let score = Scorer::new().score(&result);
        assert!((score.confidence - 0.95).abs() < 1e-9);
        assert!(score.is_credible);
    }

    #[test]
    fn test_fallback_to_success_ratio() {
        let result = result_with(vec![
            ok("a", StepPayload::FactCheck(FactCheckReport::new(1, 0))),
            StepResult::failed(
                &any_step("b").optional(),
                &StepError::Handler("down".to_string()),
                Duration::ZERO,
            ),
        ]);
        assert!((Scorer::new().confidence(&result) - 0.5).abs() < 1e-9);
        assert!(!Scorer::new().is_credible(&result));
    }

    #[test]
    fn test_malformed_value_is_ignored() {
        let result = result_with(vec![
            ok("a", StepPayload::BiasAnalysis(BiasReport::new(1.7, "right"))),
            ok(
                "b",
                StepPayload::SourceVerification(SourceReport::new(1, 0).with_credibility_score(0.8)),
            ),
        ]);
        assert!((Scorer::new().confidence(&result) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_required_failure_is_never_credible() {
        let result = result_with(vec![
            ok(
                "a",
                StepPayload::SourceVerification(SourceReport::new(5, 0).with_credibility_score(1.0)),
            ),
            StepResult::failed(
                &any_step("b"),
                &StepError::Handler("down".to_string()),
                Duration::ZERO,
            ),
        ]);
        let score = Scorer::new().score(&result);
        assert_eq!(score.confidence, 1.0);
        assert!(!score.is_credible);
    }

    #[test]
    fn test_summary_lines() {
        let result = result_with(vec![
            ok("a", StepPayload::FactCheck(FactCheckReport::new(8, 2))),
            ok("b", StepPayload::BiasAnalysis(BiasReport::new(0.3, "left"))),
            ok(
                "c",
                StepPayload::ConsistencyCheck(ConsistencyReport {
                    passed: true,
                    threshold: 0.8,
                    consistency_score: Some(0.9),
                    signals: 2,
                }),
            ),
        ]);
        let summary = Scorer::new().summarize(&result);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Validation completed with 3 of 3 steps successful.");
        assert_eq!(lines[1], "Overall confidence: 80.0%");
        assert_eq!(lines[2], "- Fact-checking: 8 claims supported, 2 contradicted");
        assert_eq!(lines[3], "- Bias analysis: Overall bias score 0.3 (left)");
        assert_eq!(lines[4], "- Consistency Check completed successfully");
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let result = result_with(vec![ok(
            "a",
            StepPayload::BiasAnalysis(BiasReport::new(0.3, "left")),
        )]);
        let scorer = Scorer::new();
        assert_eq!(scorer.score(&result), scorer.score(&result));
    }
}
