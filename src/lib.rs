//! verifact - credibility validation for news articles
//!
//! A validation run plans a small dependency graph of steps for an article,
//! executes it with bounded concurrency and reduces the step reports to a
//! confidence score and a credibility verdict.
//!
//! # Core Concepts
//!
//! - **Plan**: the steps for one request and their dependencies, built by
//!   [`Planner`] from a fixed template per [`ValidationType`]
//! - **Step handlers**: pluggable [`StepHandler`]s keyed by step type; the
//!   default ones in [`handlers`] ask a model through [`LLMClient`]
//! - **Execution result**: the per-step audit trail, `failed` when a required
//!   step did not succeed
//! - **Score**: summary, overall confidence in [0, 1] and `is_credible`
//!   (confidence at or above 0.70)
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use verifact::handlers::llm_registry;
//! use verifact::pipeline::{Executor, ValidationOrchestrator};
//! use verifact::store::{InMemoryArticleStore, InMemoryCache, InMemoryValidationRepository, ValidationMemory};
//! use verifact::{Article, ValidationRequest, ValidationType};
//!
//! async fn check(client: Arc<dyn verifact::LLMClient>) -> anyhow::Result<()> {
//!     let article = Article::new("Rates rise", "The central bank raised rates by 0.25 points.");
//!     let articles = Arc::new(InMemoryArticleStore::with_articles([article.clone()]));
//!     let orchestrator = ValidationOrchestrator::new(
//!         Executor::new(Arc::new(llm_registry(client))),
//!         articles,
//!         Arc::new(InMemoryValidationRepository::new()),
//!         ValidationMemory::new(Arc::new(InMemoryCache::new())),
//!     );
//!
//!     let outcome = orchestrator
//!         .validate(ValidationRequest::new(article.id, ValidationType::FullAnalysis))
//!         .await?;
//!     println!("{:?} {:?}", outcome.status, outcome.overall_confidence);
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: planner, executor, scorer and orchestrator
//! - [`handlers`]: model-backed step handlers
//! - [`llm`]: model client abstraction
//! - [`news`]: news source directory (NewsAPI)
//! - [`store`]: cache, repository and article storage
//! - [`validation`]: requests and persisted outcomes

pub mod article;
pub mod cli;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod news;
pub mod pipeline;
pub mod store;
pub mod util;
pub mod validation;

pub use article::Article;
pub use config::{ConfigError, VerifactConfig};
pub use llm::{BackendError, GenAIClient, LLMClient};
pub use news::{NewsApiClient, SourceDirectory};
pub use pipeline::{
    ExecutionResult, Executor, HandlerRegistry, Plan, Planner, Score, Scorer, StepHandler,
    ValidationOrchestrator,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validation::{ValidationOutcome, ValidationRequest, ValidationStatus, ValidationType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_verifact() {
        assert_eq!(NAME, "verifact");
    }
}
