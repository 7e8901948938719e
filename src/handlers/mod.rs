//! Step handlers backed by a language model
//!
//! Fact checking, source verification and bias analysis each send one prompt
//! and decode a JSON answer into their typed report, optionally informed by a
//! news source directory. The consistency check is computed locally from the
//! upstream reports and fails the step when they disagree.

mod bias_analysis;
mod consistency;
mod fact_check;
pub mod response;
mod source_verification;

pub use bias_analysis::BiasAnalysisHandler;
pub use consistency::ConsistencyCheckHandler;
pub use fact_check::FactCheckHandler;
pub use source_verification::SourceVerificationHandler;

use std::sync::Arc;

use crate::llm::LLMClient;
use crate::news::SourceDirectory;
use crate::pipeline::{HandlerRegistry, StepType};

/// Registry with a handler for every step type, sharing one client
pub fn llm_registry(client: Arc<dyn LLMClient>) -> HandlerRegistry {
    build_registry(client, None)
}

/// Like [`llm_registry`], with source verification and fact checking also
/// consulting a news source directory
pub fn llm_registry_with_directory(
    client: Arc<dyn LLMClient>,
    directory: Arc<dyn SourceDirectory>,
) -> HandlerRegistry {
    build_registry(client, Some(directory))
}

fn build_registry(
    client: Arc<dyn LLMClient>,
    directory: Option<Arc<dyn SourceDirectory>>,
) -> HandlerRegistry {
    let mut fact_check = FactCheckHandler::new(client.clone());
    let mut source_verification = SourceVerificationHandler::new(client.clone());
    if let Some(directory) = directory {
        fact_check = fact_check.with_directory(directory.clone());
        source_verification = source_verification.with_directory(directory);
    }

    HandlerRegistry::new()
        .with(StepType::FactCheck, Arc::new(fact_check))
        .with(StepType::SourceVerification, Arc::new(source_verification))
        .with(
            StepType::BiasAnalysis,
            Arc::new(BiasAnalysisHandler::new(client)),
        )
        .with(
            StepType::ConsistencyCheck,
            Arc::new(ConsistencyCheckHandler::new()),
        )
}
