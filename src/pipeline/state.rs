//! Run lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Planning,
    Executing,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Planning => "planning",
            RunState::Executing => "executing",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Planning)
                | (RunState::Planning, RunState::Executing)
                | (RunState::Planning, RunState::Failed)
                | (RunState::Executing, RunState::Completed)
                | (RunState::Executing, RunState::Failed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid run transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Tracks one run through `idle -> planning -> executing -> completed | failed`
#[derive(Debug, Clone)]
pub struct Lifecycle {
    run_id: Uuid,
    state: RunState,
    history: Vec<(RunState, DateTime<Utc>)>,
}

impl Lifecycle {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            history: vec![(RunState::Idle, Utc::now())],
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[(RunState, DateTime<Utc>)] {
        &self.history
    }

    pub fn advance(&mut self, to: RunState) -> Result<(), InvalidTransition> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(InvalidTransition { from, to });
        }
        info!(run_id = %self.run_id, from = %from, to = %to, "Run state changed");
        self.state = to;
        self.history.push((to, Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lifecycle = Lifecycle::new(Uuid::new_v4());
        lifecycle.advance(RunState::Planning).unwrap();
        lifecycle.advance(RunState::Executing).unwrap();
        lifecycle.advance(RunState::Completed).unwrap();

        assert!(lifecycle.state().is_terminal());
        let states: Vec<RunState> = lifecycle.history().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            states,
            vec![
                RunState::Idle,
                RunState::Planning,
                RunState::Executing,
                RunState::Completed
            ]
        );
    }

    #[test]
    fn test_planning_can_fail() {
        let mut lifecycle = Lifecycle::new(Uuid::new_v4());
        lifecycle.advance(RunState::Planning).unwrap();
        lifecycle.advance(RunState::Failed).unwrap();
        assert_eq!(lifecycle.state(), RunState::Failed);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut lifecycle = Lifecycle::new(Uuid::new_v4());
        lifecycle.advance(RunState::Planning).unwrap();
        lifecycle.advance(RunState::Executing).unwrap();
        lifecycle.advance(RunState::Failed).unwrap();

        let err = lifecycle.advance(RunState::Executing).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: RunState::Failed,
                to: RunState::Executing
            }
        );
        assert_eq!(err.to_string(), "Invalid run transition from failed to executing");
    }

    #[test]
    fn test_cannot_skip_planning() {
        let mut lifecycle = Lifecycle::new(Uuid::new_v4());
        assert!(lifecycle.advance(RunState::Executing).is_err());
        assert_eq!(lifecycle.state(), RunState::Idle);
    }
}
