//! Typed step payloads
//!
//! Each step type produces its own report. The scorer reads the scorable fields
//! through [`StepPayload::confidence_contribution`] instead of probing maps.

use serde::{Deserialize, Serialize};

use super::error::ScoringError;
use super::step::StepType;

/// Neutral point of the bias scale
pub const NEUTRAL_BIAS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepPayload {
    FactCheck(FactCheckReport),
    SourceVerification(SourceReport),
    BiasAnalysis(BiasReport),
    ConsistencyCheck(ConsistencyReport),
}

impl StepPayload {
    pub fn step_type(&self) -> StepType {
        match self {
            StepPayload::FactCheck(_) => StepType::FactCheck,
            StepPayload::SourceVerification(_) => StepType::SourceVerification,
            StepPayload::BiasAnalysis(_) => StepType::BiasAnalysis,
            StepPayload::ConsistencyCheck(_) => StepType::ConsistencyCheck,
        }
    }

    /// Contribution of this payload to the overall confidence.
    ///
    /// The first present field wins: `confidence`, then `source_credibility_score`,
    /// then `bias_score` (mapped to `1 - |0.5 - bias_score|`). `Ok(None)` means the
    /// payload has nothing scorable.
    pub fn confidence_contribution(&self) -> Result<Option<f64>, ScoringError> {
        match self {
            StepPayload::FactCheck(report) => report
                .confidence
                .map(|c| ScoringError::check_unit("confidence", c))
                .transpose(),
            StepPayload::SourceVerification(report) => {
                if let Some(c) = report.confidence {
                    return ScoringError::check_unit("confidence", c).map(Some);
                }
                report
                    .source_credibility_score
                    .map(|s| ScoringError::check_unit("source_credibility_score", s))
                    .transpose()
            }
            StepPayload::BiasAnalysis(report) => {
                if let Some(c) = report.confidence {
                    return ScoringError::check_unit("confidence", c).map(Some);
                }
                let score = ScoringError::check_unit("bias_score", report.bias_score)?;
                Ok(Some(1.0 - (NEUTRAL_BIAS - score).abs()))
            }
            StepPayload::ConsistencyCheck(_) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    False,
    Misleading,
    Unverifiable,
}

impl Verdict {
    pub fn supports(&self) -> bool {
        matches!(self, Verdict::True)
    }

    pub fn contradicts(&self) -> bool {
        matches!(self, Verdict::False | Verdict::Misleading)
    }
}

/// Verdict on one claim extracted from the article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim: String,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckReport {
    pub claims_supported: u32,
    pub claims_contradicted: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<ClaimVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl FactCheckReport {
    pub fn new(claims_supported: u32, claims_contradicted: u32) -> Self {
        Self {
            claims_supported,
            claims_contradicted,
            confidence: None,
            claims: Vec::new(),
            summary: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Share of decided claims that were supported, if any claim was decided
    pub fn support_ratio(&self) -> Option<f64> {
        let decided = self.claims_supported + self.claims_contradicted;
        (decided > 0).then(|| f64::from(self.claims_supported) / f64::from(decided))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub reliable_sources: u32,
    pub questionable_sources: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_credibility_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reliability_indicators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_issues: Vec<String>,
    /// Whether a news source directory lists the publishing domain; `None` when not checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listed_source: Option<bool>,
}

impl SourceReport {
    pub fn new(reliable_sources: u32, questionable_sources: u32) -> Self {
        Self {
            reliable_sources,
            questionable_sources,
            source_credibility_score: None,
            confidence: None,
            reliability_indicators: Vec::new(),
            potential_issues: Vec::new(),
            listed_source: None,
        }
    }

    pub fn with_credibility_score(mut self, score: f64) -> Self {
        self.source_credibility_score = Some(score);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    /// 0.0 to 1.0, 0.5 is neutral
    pub bias_score: f64,
    pub bias_direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
}

impl BiasReport {
    pub fn new(bias_score: f64, bias_direction: impl Into<String>) -> Self {
        Self {
            bias_score,
            bias_direction: bias_direction.into(),
            confidence: None,
            reasoning: String::new(),
        }
    }

    /// 1.0 for a perfectly neutral article, 0.5 at either extreme
    pub fn neutrality(&self) -> f64 {
        1.0 - (NEUTRAL_BIAS - self.bias_score).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub passed: bool,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_score: Option<f64>,
    pub signals: usize,
}
