//! Step definitions for validation plans
//!
//! A step is one typed unit of validation work. The set of step kinds is closed:
//! each variant of [`StepKind`] carries its own parameter struct, so handlers never
//! probe an untyped parameter map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Timeout applied to steps that do not declare one
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Discriminant of a [`StepKind`], used for handler dispatch and result metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    FactCheck,
    SourceVerification,
    BiasAnalysis,
    ConsistencyCheck,
}

impl StepType {
    pub const ALL: [StepType; 4] = [
        StepType::FactCheck,
        StepType::SourceVerification,
        StepType::BiasAnalysis,
        StepType::ConsistencyCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::FactCheck => "fact_check",
            StepType::SourceVerification => "source_verification",
            StepType::BiasAnalysis => "bias_analysis",
            StepType::ConsistencyCheck => "consistency_check",
        }
    }

    /// Title-cased name used in human-readable summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            StepType::FactCheck => "Fact Check",
            StepType::SourceVerification => "Source Verification",
            StepType::BiasAnalysis => "Bias Analysis",
            StepType::ConsistencyCheck => "Consistency Check",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How deep source verification should dig
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDepth {
    #[default]
    Standard,
    Thorough,
}

impl VerificationDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationDepth::Standard => "standard",
            VerificationDepth::Thorough => "thorough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckParams {
    pub model: String,
    pub max_claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVerificationParams {
    pub depth: VerificationDepth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysisParams {
    pub aspects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheckParams {
    pub threshold: f64,
}

/// Step type together with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum StepKind {
    FactCheck(FactCheckParams),
    SourceVerification(SourceVerificationParams),
    BiasAnalysis(BiasAnalysisParams),
    ConsistencyCheck(ConsistencyCheckParams),
}

impl StepKind {
    pub fn step_type(&self) -> StepType {
        match self {
            StepKind::FactCheck(_) => StepType::FactCheck,
            StepKind::SourceVerification(_) => StepType::SourceVerification,
            StepKind::BiasAnalysis(_) => StepType::BiasAnalysis,
            StepKind::ConsistencyCheck(_) => StepType::ConsistencyCheck,
        }
    }
}

/// A single unit of validation work inside a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub kind: StepKind,
    pub priority: u32,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(
        rename = "timeout_ms",
        with = "duration_ms",
        default = "default_timeout"
    )]
    pub timeout: Duration,
}

fn default_required() -> bool {
    true
}

fn default_timeout() -> Duration {
    DEFAULT_STEP_TIMEOUT
}

impl Step {
    /// Creates a required step with priority 1, no dependencies and the default timeout
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            priority: 1,
            dependencies: BTreeSet::new(),
            required: true,
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.insert(step_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Marks the step as non-required: its failure is recorded but never fatal
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }
}

/// Serializes a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
