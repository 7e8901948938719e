//! Cross-checks the upstream reports against each other without calling the model

use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::{
    ConsistencyReport, Step, StepError, StepHandler, StepInput, StepKind, StepPayload, StepType,
};

/// Passes when the upstream signals agree within `threshold` and fails the
/// step with [`StepError::ConsistencyFailed`] otherwise.
///
/// Each upstream report is reduced to one signal in [0, 1]: the fact-check
/// support ratio (or its confidence), the source credibility score and the bias
/// neutrality. The consistency score is `1 - (max - min)`. Fewer than two
/// signals leave nothing to compare, so the check passes without a score.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyCheckHandler;

impl ConsistencyCheckHandler {
    pub fn new() -> Self {
        Self
    }
}

fn signal(payload: &StepPayload) -> Option<f64> {
    let value = match payload {
        StepPayload::FactCheck(report) => report.support_ratio().or(report.confidence),
        StepPayload::SourceVerification(report) => report
            .source_credibility_score
            .or(report.confidence),
        StepPayload::BiasAnalysis(report) => Some(report.neutrality()),
        StepPayload::ConsistencyCheck(_) => None,
    }?;
    (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(value)
}

pub(crate) fn evaluate(input: &StepInput<'_>, threshold: f64) -> ConsistencyReport {
    let signals: Vec<f64> = input.upstream_payloads().filter_map(signal).collect();

    if signals.len() < 2 {
        return ConsistencyReport {
            passed: true,
            threshold,
            consistency_score: None,
            signals: signals.len(),
        };
    }

    let max = signals.iter().copied().fold(f64::MIN, f64::max);
    let min = signals.iter().copied().fold(f64::MAX, f64::min);
    let score = 1.0 - (max - min);

    ConsistencyReport {
        passed: score >= threshold,
        threshold,
        consistency_score: Some(score),
        signals: signals.len(),
    }
}

#[async_trait]
impl StepHandler for ConsistencyCheckHandler {
    fn name(&self) -> &str {
        "consistency-check"
    }

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        let threshold = match &step.kind {
            StepKind::ConsistencyCheck(params) => params.threshold,
            other => {
                return Err(StepError::WrongStepKind {
                    handler: StepType::ConsistencyCheck,
                    step: other.step_type(),
                })
            }
        };

        let report = evaluate(input, threshold);
        debug!(
            step_id = %step.id,
            signals = report.signals,
            score = ?report.consistency_score,
            passed = report.passed,
            "Consistency check evaluated"
        );

        match report.consistency_score {
            Some(score) if !report.passed => Err(StepError::ConsistencyFailed { score, threshold }),
            _ => Ok(StepPayload::ConsistencyCheck(report)),
        }
    }
}
