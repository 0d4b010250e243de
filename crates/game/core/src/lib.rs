//! Deterministic tactical combat rules shared across clients.
//!
//! `battle-core` defines the canonical model (grid, units, effects, actions,
//! queue, turn cycle) and exposes pure APIs reused by the runtime and offline
//! tools. All state mutation flows through [`battle::BattleContext`]; the
//! types re-exported here are the vocabulary of every supporting crate.
pub mod action;
pub mod battle;
pub mod config;
pub mod effect;
pub mod error;
pub mod grid;
pub mod queue;
pub mod rng;
pub mod save;
pub mod types;
pub mod units;

pub use action::{
    ActionBuilder, ActionCosts, ActionDefinition, ActionKind, ActionRegistry, ActionTarget,
    EffectRecord, ExecutionReport, MoveRecord, Requirements, RegistryError, TargetRoll, TargetType,
    TargetingSpec, ValidationError, can_execute,
};
pub use battle::{
    BattleContext, BattleError, BattleOutcome, BattlePhase, BattleState, EndOfTurnTick,
    InteractionMode, PhaseError, TimelineEntry, TurnReport, TurnStart, TurnState,
};
pub use config::BattleConfig;
pub use effect::{ApplyOutcome, DamageType, Effect, SkipReason};
pub use error::{CoreError, ErrorSeverity, InvariantError, LookupError};
pub use grid::{
    Cell, CostMilli, Grid, GridError, Neighborhood, PathError, PathResult, Pathfinder,
    ReachableCache, TerrainKind, has_line_of_sight,
};
pub use queue::{
    ActionQueue, ExecutionEvent, ExecutionStepper, Prediction, PredictionScore, PriorityClass,
    QueuedAction, SkipCause, StepOutcome,
};
pub use rng::{BattleRng, Pcg, compute_seed};
pub use save::{SaveError, SaveState};
pub use types::{Faction, Position, TurnNumber, UnitId};
pub use units::{
    AttributeKind, AttributeModifier, Attributes, DamageOutcome, DerivedStats, Equipment,
    EquipmentSlot, EquippedItem, HotkeyBar, ResourceKind, ResourcePool, ResourceSet, StatusBoard,
    StatusInstance, StatusKind, Unit, UnitPlacement, UnitTemplate, UnitTemplateBuilder,
};
