//! Dependency-aware plan executor
//!
//! Steps become ready once every prerequisite is terminal. Ready steps are
//! started in ascending priority (then plan position) order, up to the
//! configured concurrency limit. Each handler runs under its step's timeout and
//! any failure, panic included, becomes a failed [`StepResult`] instead of
//! aborting the run.

use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use std::any::Any;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cancel::CancellationSignal;
use super::error::{ExecutionError, StepError};
use super::handler::{HandlerRegistry, StepInput};
use super::payload::StepPayload;
use super::plan::Plan;
use super::result::{ExecutionResult, StepResult};
use super::step::Step;
use crate::article::Article;

pub const DEFAULT_MAX_CONCURRENT_STEPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound on steps running at once; 1 runs the plan sequentially
    pub max_concurrent_steps: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_steps: DEFAULT_MAX_CONCURRENT_STEPS,
        }
    }
}

impl ExecutorConfig {
    pub fn sequential() -> Self {
        Self {
            max_concurrent_steps: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Waiting,
    Running,
    Done,
}

struct StepRun {
    index: usize,
    outcome: Result<StepPayload, StepError>,
    duration: Duration,
}

#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<HandlerRegistry>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn execute(&self, plan: &Plan, article: &Article) -> ExecutionResult {
        self.execute_with_cancel(plan, article, &CancellationSignal::new())
            .await
    }

    /// Runs `plan` against `article`. Cancelling `cancel` drops in-flight
    /// handlers and seals the result as failed, keeping what was already recorded.
    pub async fn execute_with_cancel(
        &self,
        plan: &Plan,
        article: &Article,
        cancel: &CancellationSignal,
    ) -> ExecutionResult {
        let run_start = Instant::now();
        let steps = plan.steps();
        let graph = plan.graph();
        let limit = self.config.max_concurrent_steps.max(1);

        let mut result = ExecutionResult::for_plan(plan);
        if let Err(e) = result.start() {
            warn!("Could not start execution: {}", e);
        }

        let mut in_degree = graph.in_degree.clone();
        let mut state = vec![SlotState::Waiting; steps.len()];
        let mut started: Vec<Option<Instant>> = vec![None; steps.len()];
        let mut payloads: Vec<Option<StepPayload>> = vec![None; steps.len()];
        let mut ready: BinaryHeap<Reverse<(u32, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse((steps[i].priority, i)))
            .collect();
        let mut running = FuturesUnordered::new();

        info!(
            plan_id = %plan.id(),
            step_count = steps.len(),
            max_concurrent_steps = limit,
            "Executing plan"
        );

        let mut cancelled = cancel.is_cancelled();
        while !cancelled {
            while running.len() < limit {
                let Some(Reverse((_, idx))) = ready.pop() else {
                    break;
                };
                let step = &steps[idx];
                let mut input = StepInput::new(article);
                for prerequisite in graph.transitive_prerequisites(idx) {
                    if let Some(payload) = &payloads[prerequisite] {
                        input = input.with_upstream(steps[prerequisite].id.clone(), payload.clone());
                    }
                }

                debug!(step_id = %step.id, step_type = %step.step_type(), "Starting step");
                state[idx] = SlotState::Running;
                started[idx] = Some(Instant::now());
                running.push(self.run_step(idx, step, input));
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                }
                Some(run) = running.next() => {
                    let idx = run.index;
                    let step = &steps[idx];
                    state[idx] = SlotState::Done;

                    match run.outcome {
                        Ok(payload) => {
                            info!(
                                step_id = %step.id,
                                step_type = %step.step_type(),
                                duration_ms = run.duration.as_millis() as u64,
                                success = true,
                                "Step finished"
                            );
                            payloads[idx] = Some(payload.clone());
                            record(&mut result, StepResult::succeeded(step, payload, run.duration));
                            release_dependents(idx, steps, &graph.dependents, &mut in_degree, &state, &mut ready);
                        }
                        Err(err) => {
                            warn!(
                                step_id = %step.id,
                                step_type = %step.step_type(),
                                duration_ms = run.duration.as_millis() as u64,
                                success = false,
                                required = step.required,
                                error = %err,
                                "Step failed"
                            );
                            record(&mut result, StepResult::failed(step, &err, run.duration));

                            if step.required {
                                for dep in graph.transitive_dependents(idx) {
                                    if state[dep] == SlotState::Waiting {
                                        state[dep] = SlotState::Done;
                                        debug!(step_id = %steps[dep].id, prerequisite = %step.id, "Skipping step");
                                        record(&mut result, StepResult::skipped(&steps[dep], &step.id));
                                    }
                                }
                            } else {
                                release_dependents(idx, steps, &graph.dependents, &mut in_degree, &state, &mut ready);
                            }
                        }
                    }
                }
            }
        }

        if cancelled {
            drop(running);
            for (idx, step) in steps.iter().enumerate() {
                match state[idx] {
                    SlotState::Running => {
                        let elapsed = started[idx].map(|t| t.elapsed()).unwrap_or_default();
                        record(&mut result, StepResult::cancelled(step, elapsed));
                    }
                    SlotState::Waiting => {
                        record(&mut result, StepResult::not_started(step));
                    }
                    SlotState::Done => {}
                }
            }
            warn!(plan_id = %plan.id(), "Validation run cancelled");
            if let Err(e) = result.abort(ExecutionError::Cancelled) {
                warn!("Could not seal cancelled execution: {}", e);
            }
        } else if let Err(e) = result.finalize() {
            warn!("Could not finalize execution: {}", e);
        }

        info!(
            plan_id = %plan.id(),
            status = ?result.status(),
            successful = result.successful_steps(),
            duration_ms = run_start.elapsed().as_millis() as u64,
            "Plan execution finished"
        );

        result
    }

    async fn run_step<'a>(&self, index: usize, step: &'a Step, input: StepInput<'a>) -> StepRun {
        let start = Instant::now();
        let step_type = step.step_type();

        let outcome = match self.registry.get(step_type) {
            None => Err(StepError::UnknownStepType(step_type)),
            Some(handler) => {
                let guarded = AssertUnwindSafe(handler.run(step, &input)).catch_unwind();
                match tokio::time::timeout(step.timeout, guarded).await {
                    Err(_) => Err(StepError::Timeout(step.timeout)),
                    Ok(Err(panic)) => Err(StepError::Panicked(panic_message(&*panic))),
                    Ok(Ok(Ok(payload))) if payload.step_type() != step_type => {
                        Err(StepError::InvalidPayload(format!(
                            "{} handler returned a {} payload",
                            step_type,
                            payload.step_type()
                        )))
                    }
                    Ok(Ok(outcome)) => outcome,
                }
            }
        };

        StepRun {
            index,
            outcome,
            duration: start.elapsed(),
        }
    }
}

/// Appends a step result; the result is only sealed after the loop, so this cannot fail
fn record(result: &mut ExecutionResult, step_result: StepResult) {
    if let Err(e) = result.record(step_result) {
        warn!("Dropping step result: {}", e);
    }
}

fn release_dependents(
    idx: usize,
    steps: &[Step],
    dependents: &[Vec<usize>],
    in_degree: &mut [usize],
    state: &[SlotState],
    ready: &mut BinaryHeap<Reverse<(u32, usize)>>,
) {
    for &d in &dependents[idx] {
        in_degree[d] -= 1;
        if in_degree[d] == 0 && state[d] == SlotState::Waiting {
            ready.push(Reverse((steps[d].priority, d)));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
