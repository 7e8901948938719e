//! Step handler trait and registry

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::error::StepError;
use super::payload::StepPayload;
use super::step::{Step, StepType};
use crate::article::Article;

/// What a handler gets to see: the article and the payloads of finished prerequisites.
///
/// `upstream` covers every step the handler's step depends on, directly or
/// transitively. Only successful ones appear; a failed non-required
/// prerequisite is simply absent.
#[derive(Debug, Clone)]
pub struct StepInput<'a> {
    pub article: &'a Article,
    pub upstream: BTreeMap<String, StepPayload>,
}

impl<'a> StepInput<'a> {
    pub fn new(article: &'a Article) -> Self {
        Self {
            article,
            upstream: BTreeMap::new(),
        }
    }

    pub fn with_upstream(mut self, step_id: impl Into<String>, payload: StepPayload) -> Self {
        self.upstream.insert(step_id.into(), payload);
        self
    }

    pub fn upstream(&self, step_id: &str) -> Option<&StepPayload> {
        self.upstream.get(step_id)
    }

    pub fn upstream_payloads(&self) -> impl Iterator<Item = &StepPayload> {
        self.upstream.values()
    }
}

#[async_trait]
pub trait StepHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, step: &Step, input: &StepInput<'_>) -> Result<StepPayload, StepError>;
}

/// Handlers keyed by the step type they serve
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `step_type`, replacing any previous one
    pub fn register(&mut self, step_type: StepType, handler: Arc<dyn StepHandler>) -> &mut Self {
        self.handlers.insert(step_type, handler);
        self
    }

    pub fn with(mut self, step_type: StepType, handler: Arc<dyn StepHandler>) -> Self {
        self.register(step_type, handler);
        self
    }

    pub fn get(&self, step_type: StepType) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&step_type).cloned()
    }

    pub fn contains(&self, step_type: StepType) -> bool {
        self.handlers.contains_key(&step_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<String> = self
            .handlers
            .iter()
            .map(|(t, h)| format!("{}={}", t, h.name()))
            .collect();
        registered.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &registered)
            .finish()
    }
}
