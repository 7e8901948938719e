//! Scripted step handlers and wiring shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use verifact::pipeline::{
    BiasReport, ConsistencyReport, Executor, ExecutorConfig, FactCheckReport, HandlerRegistry,
    SourceReport, Step, StepError, StepHandler, StepInput, StepPayload, StepType,
    ValidationOrchestrator,
};
use verifact::store::{
    InMemoryArticleStore, InMemoryCache, InMemoryValidationRepository, ValidationMemory,
};
use verifact::Article;

/// A plausible successful payload for each step type
pub fn sample_payload(step_type: StepType) -> StepPayload {
    match step_type {
        StepType::FactCheck => StepPayload::FactCheck(FactCheckReport::new(8, 2)),
        StepType::SourceVerification => {
            StepPayload::SourceVerification(SourceReport::new(0, 0).with_credibility_score(0.9))
        }
        StepType::BiasAnalysis => StepPayload::BiasAnalysis(BiasReport::new(0.5, "neutral")),
        StepType::ConsistencyCheck => StepPayload::ConsistencyCheck(ConsistencyReport {
            passed: true,
            threshold: 0.8,
            consistency_score: None,
            signals: 0,
        }),
    }
}

pub fn article() -> Article {
    Article::new(
        "Central bank raises rates",
        "The central bank raised its benchmark rate by 0.25 points on Tuesday.",
    )
    .with_source("Daily Planet")
    .with_url("https://example.com/rates")
}

pub struct StaticHandler(pub StepPayload);

#[async_trait]
impl StepHandler for StaticHandler {
    fn name(&self) -> &str {
        "static"
    }

    async fn run(&self, _step: &Step, _input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        Ok(self.0.clone())
    }
}

pub struct FailingHandler(pub &'static str);

#[async_trait]
impl StepHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _step: &Step, _input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        Err(StepError::Handler(self.0.to_string()))
    }
}

/// Sleeps for `delay`, then answers with the sample payload
pub struct SlowHandler(pub Duration);

#[async_trait]
impl StepHandler for SlowHandler {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, step: &Step, _input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        tokio::time::sleep(self.0).await;
        Ok(sample_payload(step.step_type()))
    }
}

/// Records start order and the peak number of steps running at once
#[derive(Default)]
pub struct RecordingHandler {
    delay: Duration,
    started: Mutex<Vec<String>>,
    upstream_seen: Mutex<Vec<(String, Vec<String>)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingHandler {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Upstream step ids each step received
    pub fn upstream_seen(&self) -> Vec<(String, Vec<String>)> {
        self.upstream_seen.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError> {
        self.started.lock().unwrap().push(step.id.clone());
        self.upstream_seen
            .lock()
            .unwrap()
            .push((step.id.clone(), input.upstream.keys().cloned().collect()));

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(sample_payload(step.step_type()))
    }
}

/// Registers `handler` for every step type
pub fn registry_of(handler: Arc<dyn StepHandler>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for step_type in StepType::ALL {
        registry.register(step_type, handler.clone());
    }
    registry
}

/// Sample payloads for every step type
pub fn happy_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for step_type in StepType::ALL {
        registry.register(step_type, Arc::new(StaticHandler(sample_payload(step_type))));
    }
    registry
}

pub fn executor(registry: HandlerRegistry) -> Executor {
    Executor::new(Arc::new(registry))
}

pub fn sequential_executor(registry: HandlerRegistry) -> Executor {
    Executor::new(Arc::new(registry)).with_config(ExecutorConfig::sequential())
}

/// Orchestrator over in-memory stores, with handles to inspect them
pub struct Harness {
    pub orchestrator: ValidationOrchestrator,
    pub repository: Arc<InMemoryValidationRepository>,
    pub cache: Arc<InMemoryCache>,
    pub article: Article,
}

impl Harness {
    pub fn new(registry: HandlerRegistry) -> Self {
        let article = article();
        let repository = Arc::new(InMemoryValidationRepository::new());
        let cache = Arc::new(InMemoryCache::new());
        let orchestrator = ValidationOrchestrator::new(
            executor(registry),
            Arc::new(InMemoryArticleStore::with_articles([article.clone()])),
            repository.clone(),
            ValidationMemory::new(cache.clone()),
        );
        Self {
            orchestrator,
            repository,
            cache,
            article,
        }
    }
}
