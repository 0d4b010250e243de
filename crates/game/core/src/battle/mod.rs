//! Battle context: owned composition of everything one battle needs.
//!
//! There are no global registries. A [`BattleContext`] owns the grid and unit
//! table (via [`BattleState`]), the action registry, the queue, the rng, and
//! the turn machinery; every facade call takes `&mut BattleContext`.

mod phase;
mod state;
mod turn;

pub use phase::{BattleOutcome, BattlePhase, InteractionMode, PhaseError};
pub use state::BattleState;
pub use turn::{EndOfTurnTick, TurnReport, TurnStart, TurnState};

use crate::action::{
    ActionDefinition, ActionRegistry, ActionTarget, ExecutionReport, ValidationError, execute,
    preview,
};
use crate::config::BattleConfig;
use crate::error::{CoreError, ErrorSeverity, InvariantError, LookupError};
use crate::grid::{Grid, GridError, ReachableCache};
use crate::queue::{ActionQueue, ExecutionStepper, Prediction, PriorityClass};
use crate::rng::BattleRng;
use crate::types::{Faction, Position, UnitId};
use crate::units::{Unit, UnitTemplate};

/// Anything a battle facade call can fail with.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error("battle is over")]
    BattleOver,

    #[error("battle has not started")]
    NotStarted,

    #[error("unit {0} is not the active unit")]
    NotActiveUnit(UnitId),
}

impl CoreError for BattleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Lookup(e) => e.severity(),
            Self::Validation(e) => e.severity(),
            Self::Grid(e) => e.severity(),
            Self::Phase(e) => e.severity(),
            Self::Invariant(e) => e.severity(),
            Self::BattleOver | Self::NotStarted | Self::NotActiveUnit(_) => {
                ErrorSeverity::Recoverable
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Lookup(e) => e.error_code(),
            Self::Validation(e) => e.error_code(),
            Self::Grid(e) => e.error_code(),
            Self::Phase(e) => e.error_code(),
            Self::Invariant(e) => e.error_code(),
            Self::BattleOver => "BATTLE_OVER",
            Self::NotStarted => "BATTLE_NOT_STARTED",
            Self::NotActiveUnit(_) => "BATTLE_NOT_ACTIVE_UNIT",
        }
    }
}

/// One row of a timeline preview.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimelineEntry {
    pub sequence: usize,
    pub order: i32,
    pub unit_id: UnitId,
    pub action_id: String,
    pub priority: PriorityClass,
    pub targets: usize,
}

/// Everything one battle owns.
#[derive(Clone, Debug)]
pub struct BattleContext {
    pub config: BattleConfig,
    pub state: BattleState,
    pub queue: ActionQueue,
    pub registry: ActionRegistry,
    pub rng: BattleRng,
    pub turn: TurnState,
    pub stepper: ExecutionStepper,
    /// Movement-range cache; generation-checked against the grid.
    pub reach_cache: ReachableCache,
}

impl BattleContext {
    pub fn new(config: BattleConfig, registry: ActionRegistry, grid: Grid, seed: u64) -> Self {
        let stepper = ExecutionStepper::new(&config);
        Self {
            config,
            state: BattleState::new(grid),
            queue: ActionQueue::new(),
            registry,
            rng: BattleRng::new(seed),
            turn: TurnState::default(),
            stepper,
            reach_cache: ReachableCache::new(),
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Instantiates a template onto the board.
    pub fn spawn(
        &mut self,
        template: &UnitTemplate,
        faction: Faction,
        position: Position,
    ) -> Result<UnitId, BattleError> {
        let id = self.state.allocate_id();
        let unit = Unit::from_template(id, faction, template);
        self.state.spawn(unit, position)?;
        Ok(id)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn unit(&self, id: UnitId) -> Result<&Unit, BattleError> {
        self.state
            .unit(id)
            .ok_or(BattleError::Lookup(LookupError::UnknownUnit(id)))
    }

    pub fn action(&self, id: &str) -> Result<&ActionDefinition, BattleError> {
        self.registry
            .get(id)
            .ok_or_else(|| BattleError::Lookup(LookupError::UnknownAction(id.to_string())))
    }

    /// Actions the unit could start right now.
    pub fn available_actions(&self, unit_id: UnitId) -> Result<Vec<&ActionDefinition>, BattleError> {
        let unit = self.unit(unit_id)?;
        Ok(self.registry.available_for(unit).collect())
    }

    /// Hotkey bar with per-slot availability for the UI.
    pub fn hotkey_availability(&self, unit_id: UnitId) -> Result<Vec<(Option<String>, bool)>, BattleError> {
        let unit = self.unit(unit_id)?;
        Ok(unit
            .hotkeys
            .iter()
            .map(|slot| {
                let available = slot.as_deref().is_some_and(|action_id| {
                    self.registry.get(action_id).is_some_and(|action| {
                        action.costs.affordable_by(unit)
                            && action.requirements.met_by(unit)
                            && unit.cooldown_of(action_id) == 0
                    })
                });
                (slot.clone(), available)
            })
            .collect())
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Validates and queues an action for any living unit.
    ///
    /// Priority defaults to the action's own class; the caller may override.
    pub fn queue_action(
        &mut self,
        unit_id: UnitId,
        action_id: &str,
        targets: Vec<ActionTarget>,
        priority: Option<PriorityClass>,
        prediction: Option<Prediction>,
    ) -> Result<u64, BattleError> {
        self.ensure_running()?;
        let action = self
            .registry
            .get(action_id)
            .ok_or_else(|| BattleError::Lookup(LookupError::UnknownAction(action_id.to_string())))?;
        let unit = self
            .state
            .unit(unit_id)
            .ok_or(BattleError::Lookup(LookupError::UnknownUnit(unit_id)))?;
        if !unit.is_alive() {
            return Err(ValidationError::TargetDead(unit_id).into());
        }
        crate::action::can_execute(&self.state, &self.config, unit, action, &targets)?;

        let sequence = self.queue.enqueue(
            unit_id,
            action_id,
            targets,
            priority.unwrap_or(action.priority),
            action.initiative_bonus,
            action.cast_time,
            prediction,
            self.turn.round,
        );
        Ok(sequence)
    }

    /// Executes an action right now, bypassing the queue. Only the active
    /// unit may act immediately.
    pub fn execute_immediately(
        &mut self,
        unit_id: UnitId,
        action_id: &str,
        targets: &[ActionTarget],
    ) -> Result<ExecutionReport, BattleError> {
        self.ensure_running()?;
        if self.turn.active_unit != Some(unit_id) {
            return Err(BattleError::NotActiveUnit(unit_id));
        }
        let action = self
            .registry
            .get(action_id)
            .ok_or_else(|| BattleError::Lookup(LookupError::UnknownAction(action_id.to_string())))?;
        let report = execute(
            &mut self.state,
            &self.config,
            &mut self.rng,
            action,
            unit_id,
            targets,
        )?;
        Ok(report)
    }

    /// Side-effect-free preview with predicted magnitudes.
    pub fn preview(
        &self,
        unit_id: UnitId,
        action_id: &str,
        targets: &[ActionTarget],
    ) -> Result<ExecutionReport, BattleError> {
        let action = self.action(action_id)?;
        Ok(preview(&self.state, &self.config, action, unit_id, targets)?)
    }

    /// Resolves the timeline and renders it for planning UIs.
    pub fn timeline_preview(&mut self) -> Vec<TimelineEntry> {
        let initiatives = self.initiative_table();
        self.queue
            .resolve(|id| initiatives.get(&id).copied().unwrap_or(50))
            .iter()
            .enumerate()
            .map(|(sequence, event)| TimelineEntry {
                sequence,
                order: event.order,
                unit_id: event.queued.unit_id,
                action_id: event.queued.action_id.clone(),
                priority: event.queued.priority,
                targets: event.queued.targets.len(),
            })
            .collect()
    }

    /// Tiles the unit can reach with its remaining movement, cached.
    pub fn reachable_tiles(
        &mut self,
        unit_id: UnitId,
    ) -> Result<std::sync::Arc<std::collections::BTreeSet<Position>>, BattleError> {
        let unit = self
            .state
            .unit(unit_id)
            .ok_or(BattleError::Lookup(LookupError::UnknownUnit(unit_id)))?;
        let start = unit.position.ok_or(ValidationError::CasterOffBoard)?;
        let budget = unit.movement_points();
        self.reach_cache
            .reachable(&self.state.grid, unit_id, start, budget)
            .map_err(|_| ValidationError::DestinationUnreachable.into())
    }

    pub(crate) fn initiative_table(&self) -> std::collections::BTreeMap<UnitId, i32> {
        self.state
            .units()
            .map(|unit| (unit.id, unit.initiative()))
            .collect()
    }

    pub(crate) fn ensure_running(&self) -> Result<(), BattleError> {
        if self.turn.phase == BattlePhase::BattleOver {
            return Err(BattleError::BattleOver);
        }
        if self.turn.phase == BattlePhase::Idle {
            return Err(BattleError::NotStarted);
        }
        Ok(())
    }
}
