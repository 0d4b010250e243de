//! Execution stepper: drains the resolved timeline one event at a time.
//!
//! For each popped event:
//! 1. dead caster → skip
//! 2. re-validate (the world may have changed since queueing) → skip if invalid
//! 3. execute and score the player's prediction, if any
//! 4. record the report in a bounded history ring

use std::collections::VecDeque;

use crate::action::{ActionRegistry, ExecutionReport, ValidationError, execute};
use crate::battle::BattleState;
use crate::config::BattleConfig;
use crate::rng::BattleRng;

use super::{ActionQueue, Prediction, QueuedAction};

/// Why a popped event did not execute.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipCause {
    DeadCaster,
    UnknownAction,
    Invalid(ValidationError),
}

/// A scored player prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictionScore {
    pub prediction: Prediction,
    pub accurate: bool,
}

/// Result of one stepper advance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Executed {
        queued: QueuedAction,
        report: ExecutionReport,
        prediction: Option<PredictionScore>,
    },
    Skipped {
        queued: QueuedAction,
        cause: SkipCause,
    },
    /// Timeline exhausted.
    Idle,
}

/// Drains timelines and keeps the last N execution reports.
#[derive(Clone, Debug)]
pub struct ExecutionStepper {
    history: VecDeque<ExecutionReport>,
    capacity: usize,
    tolerance_pct: u32,
}

impl ExecutionStepper {
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_size),
            capacity: config.history_size,
            tolerance_pct: config.prediction_tolerance_pct,
        }
    }

    /// Executed-action history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ExecutionReport> {
        self.history.iter()
    }

    /// Pops and processes the next timeline event.
    pub fn step(
        &mut self,
        queue: &mut ActionQueue,
        state: &mut BattleState,
        registry: &ActionRegistry,
        config: &BattleConfig,
        rng: &mut BattleRng,
    ) -> StepOutcome {
        let Some(event) = queue.pop_next() else {
            return StepOutcome::Idle;
        };
        let queued = event.queued;

        // 1. Dead casters are skipped, never errored.
        let caster_alive = state
            .unit(queued.unit_id)
            .is_some_and(|unit| unit.is_alive());
        if !caster_alive {
            tracing::debug!(unit = %queued.unit_id, action = %queued.action_id, "skipped: dead caster");
            return StepOutcome::Skipped {
                queued,
                cause: SkipCause::DeadCaster,
            };
        }

        let Some(action) = registry.get(&queued.action_id) else {
            tracing::warn!(action = %queued.action_id, "skipped: unknown action at execution");
            return StepOutcome::Skipped {
                queued,
                cause: SkipCause::UnknownAction,
            };
        };

        // 2-3. Re-validate, then execute.
        match execute(state, config, rng, action, queued.unit_id, &queued.targets) {
            Ok(report) => {
                let prediction = queued
                    .prediction
                    .clone()
                    .map(|p| self.score_prediction(p, &report));
                self.record(report.clone());
                StepOutcome::Executed {
                    queued,
                    report,
                    prediction,
                }
            }
            Err(error) => {
                tracing::debug!(
                    unit = %queued.unit_id,
                    action = %queued.action_id,
                    %error,
                    "skipped: invalid at execution"
                );
                StepOutcome::Skipped {
                    queued,
                    cause: SkipCause::Invalid(error),
                }
            }
        }
    }

    /// Runs the stepper until the timeline empties.
    pub fn run_all(
        &mut self,
        queue: &mut ActionQueue,
        state: &mut BattleState,
        registry: &ActionRegistry,
        config: &BattleConfig,
        rng: &mut BattleRng,
    ) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.step(queue, state, registry, config, rng) {
                StepOutcome::Idle => break,
                outcome => outcomes.push(outcome),
            }
        }
        outcomes
    }

    /// Accuracy rule per prediction kind: damage within the configured
    /// tolerance, kills by membership in the death list.
    fn score_prediction(&self, prediction: Prediction, report: &ExecutionReport) -> PredictionScore {
        let accurate = match &prediction {
            Prediction::Damage(expected) => {
                let tolerance = (expected.abs() * self.tolerance_pct as i32) / 100;
                (report.damage_total - expected).abs() <= tolerance
            }
            Prediction::Kill(unit) => report.deaths.contains(unit),
        };
        PredictionScore {
            prediction,
            accurate,
        }
    }

    fn record(&mut self, report: ExecutionReport) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(report);
    }
}
