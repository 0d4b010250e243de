//! Action execution pipeline.
//!
//! Flow: validate → consume costs → resolve final targets → accuracy rolls →
//! apply effects in (effect-index, target-index) row-major order → cooldown →
//! report. Preview runs the same pipeline against [`crate::effect::Effect::predict`]
//! and touches nothing.
//!
//! Area actions resolve their membership here, at execution time: every
//! living unit within the Manhattan radius of each declared center that the
//! target-type filter admits. The caster's own tile gets no special
//! treatment; an enemy-typed area simply never admits the caster's faction.

use std::collections::BTreeSet;

use crate::battle::BattleState;
use crate::config::BattleConfig;
use crate::effect::{ApplyOutcome, Effect};
use crate::grid::{CostMilli, Pathfinder};
use crate::rng::{BattleRng, roll};
use crate::types::{Position, UnitId};
use crate::units::{AttributeKind, StatusKind, Unit};

use super::cost::ActionCosts;
use super::definition::{ActionDefinition, ActionKind};
use super::targeting::ActionTarget;
use super::validate::{self, ValidationError};

/// Critical hits multiply damage by 150%.
const CRIT_NUMERATOR: i32 = 150;

/// One effect application against one resolved target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectRecord {
    pub effect_index: usize,
    pub target: ActionTarget,
    pub outcome: ApplyOutcome,
}

/// Accuracy/critical roll for one targeted unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetRoll {
    pub target: UnitId,
    pub roll: u32,
    pub hit: bool,
    pub critical: bool,
}

/// Movement outcome for Move-kind actions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveRecord {
    pub from: Position,
    pub to: Position,
    pub path: Vec<Position>,
    pub cost: CostMilli,
    pub ap_spent: i32,
}

/// Structured result of one action execution (or preview).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionReport {
    pub action_id: String,
    pub action_name: String,
    pub caster: UnitId,
    /// Set on previews: magnitudes are predictions, nothing was mutated.
    pub hypothetical: bool,

    pub rolls: Vec<TargetRoll>,
    pub records: Vec<EffectRecord>,

    pub damage_total: i32,
    pub healing_total: i32,
    pub costs_consumed: ActionCosts,
    /// Units whose HP reached zero during this execution.
    pub deaths: Vec<UnitId>,
    pub statuses_applied: Vec<(UnitId, StatusKind)>,
    pub movement: Option<MoveRecord>,
}

impl ExecutionReport {
    fn new(action: &ActionDefinition, caster: UnitId, hypothetical: bool) -> Self {
        Self {
            action_id: action.id.clone(),
            action_name: action.name.clone(),
            caster,
            hypothetical,
            rolls: Vec::new(),
            records: Vec::new(),
            damage_total: 0,
            healing_total: 0,
            costs_consumed: ActionCosts::free(),
            deaths: Vec::new(),
            statuses_applied: Vec::new(),
            movement: None,
        }
    }

    fn absorb(&mut self, effect_index: usize, target: ActionTarget, outcome: ApplyOutcome) {
        self.damage_total += outcome.damage_dealt();
        if let ApplyOutcome::Heal { healed, .. } = outcome {
            self.healing_total += healed;
        }
        if let (ApplyOutcome::Status { kind, .. }, ActionTarget::Unit(unit)) = (&outcome, target) {
            self.statuses_applied.push((unit, *kind));
        }
        if let (true, ActionTarget::Unit(unit)) = (outcome.killed_target(), target) {
            self.deaths.push(unit);
        }
        self.records.push(EffectRecord {
            effect_index,
            target,
            outcome,
        });
    }
}

/// Validates and executes `action`, mutating the battle state.
///
/// Costs are consumed whenever validation passes, even if every individual
/// effect ends up skipped; per-effect refunds would make multi-effect costs
/// ambiguous.
pub fn execute(
    state: &mut BattleState,
    config: &BattleConfig,
    rng: &mut BattleRng,
    action: &ActionDefinition,
    caster_id: UnitId,
    targets: &[ActionTarget],
) -> Result<ExecutionReport, ValidationError> {
    let caster = state
        .unit(caster_id)
        .ok_or(ValidationError::UnknownTarget(caster_id))?;
    if !caster.is_alive() {
        return Err(ValidationError::TargetDead(caster_id));
    }
    validate::can_execute(state, config, caster, action, targets)?;

    if action.kind == ActionKind::Move {
        return execute_move(state, config, rng, action, caster_id, targets);
    }

    let crit_chance = crit_chance(caster);
    let resolved = resolve_targets(state, caster, action, targets);

    let mut report = ExecutionReport::new(action, caster_id, false);

    // Costs come out before any effect lands.
    if let Some(unit) = state.unit_mut(caster_id) {
        action.costs.consume(unit);
    }
    report.costs_consumed = action.costs;

    // Accuracy and critical rolls, one pair per targeted unit.
    for (index, target) in resolved.iter().enumerate() {
        let ActionTarget::Unit(unit_id) = *target else {
            continue;
        };
        let roll_value = rng.d100(unit_id, roll::ACCURACY + index as u32 * 2);
        let hit = action.guaranteed_hit || roll_value <= action.accuracy;
        let critical = hit
            && action.can_critical
            && rng.d100(unit_id, roll::CRITICAL + index as u32 * 2) <= crit_chance;
        report.rolls.push(TargetRoll {
            target: unit_id,
            roll: roll_value,
            hit,
            critical,
        });
    }

    // Row-major application: effect-index outer, target-index inner.
    for (effect_index, effect) in action.effects.iter().enumerate() {
        for target in &resolved {
            match *target {
                ActionTarget::Unit(unit_id) => {
                    let Some(roll_entry) = report.rolls.iter().find(|r| r.target == unit_id) else {
                        continue;
                    };
                    if !roll_entry.hit {
                        continue;
                    }
                    let effect = boost_for_critical(effect, roll_entry.critical);
                    let Some(unit) = state.unit_mut(unit_id) else {
                        continue;
                    };
                    let outcome = effect.apply(unit, &action.id);
                    report.absorb(effect_index, *target, outcome);
                }
                ActionTarget::Tile(position) => {
                    let outcome = effect.apply_to_tile(&mut state.grid, position);
                    if !outcome.is_skip() {
                        report.absorb(effect_index, *target, outcome);
                    }
                }
            }
        }
    }

    // Deaths clear the board immediately; queued actions of the dead are
    // skipped later by the execution stepper.
    for &dead in &report.deaths {
        state.remove_from_board(dead);
        tracing::debug!(unit = %dead, action = %action.id, "unit died");
    }

    if let Some(unit) = state.unit_mut(caster_id) {
        unit.set_cooldown(&action.id, action.cooldown);
    }
    rng.advance();

    Ok(report)
}

/// Non-mutating preview of [`execute`] with identical magnitudes.
///
/// Predictions assume every accuracy roll succeeds and no criticals land, so
/// a guaranteed-hit action with `can_critical` off previews exactly what it
/// will do.
pub fn preview(
    state: &BattleState,
    config: &BattleConfig,
    action: &ActionDefinition,
    caster_id: UnitId,
    targets: &[ActionTarget],
) -> Result<ExecutionReport, ValidationError> {
    let caster = state
        .unit(caster_id)
        .ok_or(ValidationError::UnknownTarget(caster_id))?;
    if !caster.is_alive() {
        return Err(ValidationError::TargetDead(caster_id));
    }
    validate::can_execute(state, config, caster, action, targets)?;

    let mut report = ExecutionReport::new(action, caster_id, true);
    report.costs_consumed = action.costs;

    if action.kind == ActionKind::Move {
        if let Some(destination) = targets.first().and_then(|t| t.tile())
            && let Some(start) = caster.position
        {
            let path = Pathfinder::new(&state.grid)
                .excluding(caster_id)
                .find_path(start, destination, Some(caster.movement_points()))
                .map_err(|_| ValidationError::DestinationUnreachable)?;
            let tiles = path.path.len().saturating_sub(1) as i32;
            report.movement = Some(MoveRecord {
                from: start,
                to: destination,
                cost: path.cost,
                path: path.path,
                ap_spent: tiles * config.movement_ap_per_tile as i32,
            });
        }
        return Ok(report);
    }

    let resolved = resolve_targets(state, caster, action, targets);
    for (effect_index, effect) in action.effects.iter().enumerate() {
        for target in &resolved {
            match *target {
                ActionTarget::Unit(unit_id) => {
                    let Some(unit) = state.unit(unit_id) else {
                        continue;
                    };
                    report.absorb(effect_index, *target, effect.predict(unit));
                }
                ActionTarget::Tile(position) => {
                    if let Effect::TerrainChange { terrain } = effect
                        && let Some(cell) = state.grid.cell(position)
                    {
                        report.absorb(
                            effect_index,
                            *target,
                            ApplyOutcome::Terrain {
                                position,
                                before: cell.terrain,
                                after: *terrain,
                            },
                        );
                    }
                }
            }
        }
    }
    // Each damage effect predicts against the same unchanged HP, so
    // overlapping effects can predict the same death twice.
    report.deaths.sort();
    report.deaths.dedup();

    Ok(report)
}

fn execute_move(
    state: &mut BattleState,
    config: &BattleConfig,
    rng: &mut BattleRng,
    action: &ActionDefinition,
    caster_id: UnitId,
    targets: &[ActionTarget],
) -> Result<ExecutionReport, ValidationError> {
    let caster = state
        .unit(caster_id)
        .ok_or(ValidationError::UnknownTarget(caster_id))?;
    let start = caster.position.ok_or(ValidationError::CasterOffBoard)?;
    let destination = targets
        .first()
        .and_then(|t| t.tile())
        .ok_or(ValidationError::NoTarget)?;

    let path = Pathfinder::new(&state.grid)
        .excluding(caster_id)
        .find_path(start, destination, Some(caster.movement_points()))
        .map_err(|_| ValidationError::DestinationUnreachable)?;
    if !path.success {
        return Err(ValidationError::DestinationUnreachable);
    }

    let tiles = path.path.len().saturating_sub(1) as i32;
    let move_ap = tiles * config.movement_ap_per_tile as i32;

    state
        .relocate(caster_id, destination)
        .map_err(|_| ValidationError::DestinationUnreachable)?;

    let mut report = ExecutionReport::new(action, caster_id, false);
    if let Some(unit) = state.unit_mut(caster_id) {
        action.costs.consume(unit);
        unit.resources.ap.adjust(-move_ap);
        unit.movement_remaining = unit.movement_remaining.saturating_sub(path.cost);
        unit.set_cooldown(&action.id, action.cooldown);
    }
    report.costs_consumed = action.costs;
    report.movement = Some(MoveRecord {
        from: start,
        to: destination,
        cost: path.cost,
        path: path.path,
        ap_spent: move_ap,
    });
    rng.advance();

    Ok(report)
}

/// Final target membership.
///
/// Plain actions affect their declared targets (a tile stands in for its
/// occupant under unit policies). Area actions treat each declared target as
/// a center and sweep every admitted living unit within the radius; terrain
/// effects land on the center tile itself.
fn resolve_targets(
    state: &BattleState,
    caster: &Unit,
    action: &ActionDefinition,
    targets: &[ActionTarget],
) -> Vec<ActionTarget> {
    let radius = action.targeting.area_of_effect;
    let wants_terrain = action
        .effects
        .iter()
        .any(|e| matches!(e, Effect::TerrainChange { .. }));

    let mut resolved = Vec::new();
    let mut seen = BTreeSet::new();
    let mut push = |target: ActionTarget, out: &mut Vec<ActionTarget>| {
        if seen.insert(target) {
            out.push(target);
        }
    };

    for declared in targets {
        let center = match *declared {
            ActionTarget::Tile(position) => Some(position),
            ActionTarget::Unit(id) => state.unit(id).and_then(|u| u.position),
        };

        if radius == 0 {
            match *declared {
                ActionTarget::Unit(_) => push(*declared, &mut resolved),
                ActionTarget::Tile(position) => {
                    if wants_terrain {
                        push(ActionTarget::Tile(position), &mut resolved);
                    }
                    if let Some(occupant) = state.grid.occupant(position) {
                        push(ActionTarget::Unit(occupant), &mut resolved);
                    }
                }
            }
            continue;
        }

        let Some(center) = center else { continue };
        if wants_terrain {
            push(ActionTarget::Tile(center), &mut resolved);
        }
        for unit in state.units_within(center, radius) {
            if action.targeting.target_type.admits(
                caster.id,
                caster.faction,
                unit.id,
                unit.faction,
            ) {
                push(ActionTarget::Unit(unit.id), &mut resolved);
            }
        }
    }

    resolved
}

/// Critical chance scales with finesse.
fn crit_chance(caster: &Unit) -> u32 {
    (5 + caster.effective_attribute(AttributeKind::Finesse) / 4).clamp(0, 100) as u32
}

fn boost_for_critical(effect: &Effect, critical: bool) -> Effect {
    match (critical, effect) {
        (
            true,
            Effect::Damage {
                magnitude,
                damage_type,
            },
        ) => Effect::Damage {
            magnitude: magnitude * CRIT_NUMERATOR / 100,
            damage_type: *damage_type,
        },
        _ => effect.clone(),
    }
}
