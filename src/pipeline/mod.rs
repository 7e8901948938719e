//! Validation pipeline engine
//!
//! [`Planner`] turns a request into a [`Plan`], [`Executor`] runs it through
//! type-dispatched [`StepHandler`]s, [`Scorer`] reduces the [`ExecutionResult`]
//! to a verdict and [`ValidationOrchestrator`] drives a run through its lifecycle.

pub mod cancel;
pub mod error;
pub mod executor;
pub mod handler;
pub mod orchestrator;
pub mod payload;
pub mod plan;
pub mod planner;
pub mod result;
pub mod scorer;
pub mod state;
pub mod step;

pub use cancel::CancellationSignal;
pub use error::{ExecutionError, PlanningError, ScoringError, StepError};
pub use executor::{Executor, ExecutorConfig, DEFAULT_MAX_CONCURRENT_STEPS};
pub use handler::{HandlerRegistry, StepHandler, StepInput};
pub use orchestrator::{OrchestratorError, ValidationOrchestrator};
pub use payload::{
    BiasReport, ClaimVerdict, ConsistencyReport, FactCheckReport, SourceReport, StepPayload,
    Verdict,
};
pub use plan::Plan;
pub use planner::Planner;
pub use result::{ExecutionResult, ExecutionStatus, StepMetadata, StepResult, StepStatus};
pub use scorer::{Score, Scorer, CREDIBILITY_THRESHOLD};
pub use state::{InvalidTransition, Lifecycle, RunState};
pub use step::{
    BiasAnalysisParams, ConsistencyCheckParams, FactCheckParams, SourceVerificationParams, Step,
    StepKind, StepType, VerificationDepth, DEFAULT_STEP_TIMEOUT,
};
