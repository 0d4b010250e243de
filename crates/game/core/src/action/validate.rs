//! Action validation.
//!
//! [`can_execute`] runs the checks in a fixed order: affordability,
//! requirements, cooldown, target count, range, line of sight, target-type
//! compatibility. The first failure wins, so callers get stable reason codes.

use crate::battle::BattleState;
use crate::config::BattleConfig;
use crate::error::{CoreError, ErrorSeverity};
use crate::grid::has_line_of_sight;
use crate::types::{Position, UnitId};
use crate::units::{ResourceKind, StatusKind, Unit};

use super::definition::{ActionDefinition, ActionKind};
use super::targeting::{ActionTarget, TargetType};

/// Stable reason codes for rejected actions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    #[error("insufficient {0}")]
    InsufficientResources(ResourceKind),

    #[error("requirement unmet: {0}")]
    RequirementUnmet(String),

    #[error("on cooldown for {remaining} more turns")]
    OnCooldown { remaining: u32 },

    #[error("{given} targets given, {max} allowed")]
    TooManyTargets { given: u32, max: u32 },

    #[error("no target given")]
    NoTarget,

    #[error("target at distance {distance}, range is {range}")]
    OutOfRange { distance: u32, range: u32 },

    #[error("no line of sight to target")]
    LineOfSightBlocked,

    #[error("target type mismatch")]
    TargetTypeMismatch,

    #[error("self-targeted action must target exactly the caster")]
    NotTheCaster,

    #[error("cannot target an empty tile")]
    EmptyTileForbidden,

    #[error("target unit {0} not found")]
    UnknownTarget(UnitId),

    #[error("target unit {0} is dead")]
    TargetDead(UnitId),

    #[error("caster is off the board")]
    CasterOffBoard,

    #[error("caster is stunned")]
    CasterStunned,

    #[error("caster is rooted")]
    CasterRooted,

    #[error("caster is silenced")]
    CasterSilenced,

    #[error("destination unreachable within remaining movement")]
    DestinationUnreachable,
}

impl CoreError for ValidationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientResources(_) => "VALIDATE_INSUFFICIENT_RESOURCES",
            Self::RequirementUnmet(_) => "VALIDATE_REQUIREMENT_UNMET",
            Self::OnCooldown { .. } => "VALIDATE_ON_COOLDOWN",
            Self::TooManyTargets { .. } => "VALIDATE_TOO_MANY_TARGETS",
            Self::NoTarget => "VALIDATE_NO_TARGET",
            Self::OutOfRange { .. } => "VALIDATE_OUT_OF_RANGE",
            Self::LineOfSightBlocked => "VALIDATE_LOS_BLOCKED",
            Self::TargetTypeMismatch => "VALIDATE_TARGET_TYPE_MISMATCH",
            Self::NotTheCaster => "VALIDATE_NOT_THE_CASTER",
            Self::EmptyTileForbidden => "VALIDATE_EMPTY_TILE_FORBIDDEN",
            Self::UnknownTarget(_) => "VALIDATE_UNKNOWN_TARGET",
            Self::TargetDead(_) => "VALIDATE_TARGET_DEAD",
            Self::CasterOffBoard => "VALIDATE_CASTER_OFF_BOARD",
            Self::CasterStunned => "VALIDATE_CASTER_STUNNED",
            Self::CasterRooted => "VALIDATE_CASTER_ROOTED",
            Self::CasterSilenced => "VALIDATE_CASTER_SILENCED",
            Self::DestinationUnreachable => "VALIDATE_DESTINATION_UNREACHABLE",
        }
    }
}

/// Full pre-execution check. Read-only; both queueing and the execution
/// stepper run it (the world may change between the two).
pub fn can_execute(
    state: &BattleState,
    config: &BattleConfig,
    caster: &Unit,
    action: &ActionDefinition,
    targets: &[ActionTarget],
) -> Result<(), ValidationError> {
    // 1. Resource affordability
    if let Some(kind) = action.costs.first_shortfall(caster) {
        return Err(ValidationError::InsufficientResources(kind));
    }

    // 2. Requirements (level, attribute floors, learned talents)
    if let Some(unmet) = action.requirements.first_unmet(caster) {
        return Err(ValidationError::RequirementUnmet(unmet));
    }

    // 3. Cooldown
    let remaining = caster.cooldown_of(&action.id);
    if remaining > 0 {
        return Err(ValidationError::OnCooldown { remaining });
    }

    // Status gates on the caster
    if caster.statuses.has(StatusKind::Stunned) {
        return Err(ValidationError::CasterStunned);
    }
    match action.kind {
        ActionKind::Move if caster.statuses.has(StatusKind::Rooted) => {
            return Err(ValidationError::CasterRooted);
        }
        ActionKind::Magic if caster.statuses.has(StatusKind::Silenced) => {
            return Err(ValidationError::CasterSilenced);
        }
        _ => {}
    }

    // 4. Target count
    if targets.len() as u32 > action.targeting.max_targets {
        return Err(ValidationError::TooManyTargets {
            given: targets.len() as u32,
            max: action.targeting.max_targets,
        });
    }
    if action.targeting.target_type == TargetType::SelfOnly {
        // Self-targeted actions carry exactly the caster, nothing else.
        if targets != [ActionTarget::Unit(caster.id)] {
            return Err(ValidationError::NotTheCaster);
        }
    } else if targets.is_empty() {
        return Err(ValidationError::NoTarget);
    }

    let caster_position = caster.position.ok_or(ValidationError::CasterOffBoard)?;

    for target in targets {
        let target_position = resolve_position(state, *target)?;

        // 5. Manhattan range (movement is bounded by budget instead)
        let distance = caster_position.manhattan(target_position);
        if action.kind != ActionKind::Move && distance > action.targeting.range {
            return Err(ValidationError::OutOfRange {
                distance,
                range: action.targeting.range,
            });
        }

        // 6. Line of sight
        if action.targeting.requires_line_of_sight
            && !has_line_of_sight(&state.grid, caster_position, target_position)
        {
            return Err(ValidationError::LineOfSightBlocked);
        }

        // 7. Target-type compatibility
        check_target_type(state, caster, action, *target)?;
    }

    if action.kind == ActionKind::Move {
        check_movement(state, config, caster, action, targets)?;
    }

    Ok(())
}

fn resolve_position(state: &BattleState, target: ActionTarget) -> Result<Position, ValidationError> {
    match target {
        ActionTarget::Tile(position) => Ok(position),
        ActionTarget::Unit(id) => {
            let unit = state.unit(id).ok_or(ValidationError::UnknownTarget(id))?;
            unit.position.ok_or(ValidationError::TargetDead(id))
        }
    }
}

fn check_target_type(
    state: &BattleState,
    caster: &Unit,
    action: &ActionDefinition,
    target: ActionTarget,
) -> Result<(), ValidationError> {
    let policy = action.targeting.target_type;
    match target {
        ActionTarget::Unit(id) => {
            let unit = state.unit(id).ok_or(ValidationError::UnknownTarget(id))?;
            if !unit.is_alive() {
                return Err(ValidationError::TargetDead(id));
            }
            if policy == TargetType::SelfOnly && id != caster.id {
                return Err(ValidationError::NotTheCaster);
            }
            if !policy.admits(caster.id, caster.faction, id, unit.faction) {
                return Err(ValidationError::TargetTypeMismatch);
            }
            Ok(())
        }
        ActionTarget::Tile(position) => {
            match policy {
                TargetType::SelfOnly => return Err(ValidationError::NotTheCaster),
                TargetType::Ally | TargetType::Enemy | TargetType::Any => {
                    // Unit policies accept a tile only via its occupant.
                    let occupant = state.grid.occupant(position);
                    let Some(id) = occupant else {
                        return Err(ValidationError::EmptyTileForbidden);
                    };
                    return check_target_type(state, caster, action, ActionTarget::Unit(id));
                }
                TargetType::Tile | TargetType::Area => {}
            }
            if !action.targeting.can_target_empty_tiles
                && state.grid.occupant(position).is_none()
                && action.kind != ActionKind::Move
            {
                return Err(ValidationError::EmptyTileForbidden);
            }
            Ok(())
        }
    }
}

/// Move-specific validation: a single tile destination with a path the unit
/// can still afford, both in movement points and in AP.
fn check_movement(
    state: &BattleState,
    config: &BattleConfig,
    caster: &Unit,
    action: &ActionDefinition,
    targets: &[ActionTarget],
) -> Result<(), ValidationError> {
    let destination = targets
        .first()
        .and_then(|t| t.tile())
        .ok_or(ValidationError::NoTarget)?;

    let start = caster.position.ok_or(ValidationError::CasterOffBoard)?;
    let result = crate::grid::Pathfinder::new(&state.grid)
        .excluding(caster.id)
        .find_path(start, destination, Some(caster.movement_points()))
        .map_err(|_| ValidationError::DestinationUnreachable)?;
    if !result.success {
        return Err(ValidationError::DestinationUnreachable);
    }

    let tiles = result.path.len().saturating_sub(1) as i32;
    let move_ap = tiles * config.movement_ap_per_tile as i32;
    if caster.resources.ap.current() < action.costs.ap + move_ap {
        return Err(ValidationError::InsufficientResources(ResourceKind::Ap));
    }
    Ok(())
}
