//! Save-state capture and restore.
//!
//! Persistence covers runtime unit state, the active unit, the round counter,
//! and the rng seed/nonce for deterministic replays. Static data (action
//! definitions, templates, grid terrain) is reconstructible from assets and
//! is not serialized; queues, timelines, and caches are transient and start
//! empty after a load.

use crate::action::ActionRegistry;
use crate::battle::{BattleContext, BattlePhase};
use crate::config::BattleConfig;
use crate::error::{CoreError, ErrorSeverity};
use crate::grid::{Grid, GridError};
use crate::rng::BattleRng;
use crate::types::{TurnNumber, UnitId};
use crate::units::Unit;

/// Versioned snapshot of one battle's mutable state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaveState {
    pub version: u32,
    pub active_unit: Option<UnitId>,
    pub round: TurnNumber,
    pub rng_seed: u64,
    pub rng_nonce: u64,
    pub units: Vec<Unit>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SaveError {
    #[error("save version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("saved unit placement conflicts with the grid: {0}")]
    Placement(#[from] GridError),
}

impl CoreError for SaveError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Malformed
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::VersionMismatch { .. } => "SAVE_VERSION_MISMATCH",
            Self::Placement(_) => "SAVE_PLACEMENT_CONFLICT",
        }
    }
}

impl SaveState {
    pub const VERSION: u32 = 1;

    /// Captures everything load needs from a running battle.
    pub fn capture(context: &BattleContext) -> Self {
        Self {
            version: Self::VERSION,
            active_unit: context.turn.active_unit,
            round: context.turn.round,
            rng_seed: context.rng.seed(),
            rng_nonce: context.rng.nonce(),
            units: context.state.units().cloned().collect(),
        }
    }

    /// Rebuilds a battle context around this snapshot.
    ///
    /// `grid` supplies the terrain layout (static data); occupancy is
    /// reconstructed from saved unit positions.
    pub fn restore(
        self,
        config: BattleConfig,
        registry: ActionRegistry,
        grid: Grid,
    ) -> Result<BattleContext, SaveError> {
        if self.version != Self::VERSION {
            return Err(SaveError::VersionMismatch {
                found: self.version,
                expected: Self::VERSION,
            });
        }

        let mut context = BattleContext::new(config, registry, grid, self.rng_seed);
        for unit in self.units {
            context.state.restore_unit(unit)?;
        }
        context.rng = BattleRng::restore(self.rng_seed, self.rng_nonce);
        context.turn.round = self.round;
        context.turn.active_unit = self.active_unit;
        if self.active_unit.is_some() {
            context.turn.phase = BattlePhase::SelectingAction;
            context.resume_round_order();
        }
        Ok(context)
    }
}

impl BattleContext {
    /// Rebuilds the round order after a load, pointing the cursor at the
    /// restored active unit.
    pub(crate) fn resume_round_order(&mut self) {
        let mut order: Vec<(i32, UnitId)> = self
            .state
            .living_units()
            .map(|unit| (unit.initiative(), unit.id))
            .collect();
        order.sort_by_key(|&(initiative, id)| (std::cmp::Reverse(initiative), id));
        self.turn.order = order.into_iter().map(|(_, id)| id).collect();
        self.turn.cursor = self
            .turn
            .active_unit
            .and_then(|active| self.turn.order.iter().position(|&id| id == active))
            .unwrap_or(0);
    }
}
