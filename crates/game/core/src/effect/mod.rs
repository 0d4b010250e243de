//! Typed effects: the only sanctioned mutation path into unit state.
//!
//! An action is a sequence of effects applied to resolved targets. Each kind
//! is a variant of one [`Effect`] enum with a single `apply` match, so the
//! whole mutation surface is auditable in one place.
//!
//! # Contract
//!
//! - `can_apply` is checked before `apply`; `apply` re-checks and degrades to
//!   a [`ApplyOutcome::Skipped`] record instead of panicking.
//! - Every outcome carries old/new values for observers.
//! - A skipped effect never aborts the surrounding action.

use crate::grid::{Grid, GridError, TerrainKind};
use crate::types::Position;
use crate::units::{AttributeKind, AttributeModifier, ResourceKind, StatusInstance, StatusKind, Unit};

/// Damage channels; `True` bypasses defenses.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DamageType {
    Physical,
    Magical,
    Spiritual,
    True,
}

/// A single typed mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    Damage {
        magnitude: i32,
        damage_type: DamageType,
    },
    Heal {
        magnitude: i32,
    },
    ResourceChange {
        resource: ResourceKind,
        amount: i32,
    },
    StatModifier {
        attribute: AttributeKind,
        amount: i32,
        percent: bool,
        duration: u32,
    },
    Status {
        kind: StatusKind,
        duration: u32,
    },
    TerrainChange {
        terrain: TerrainKind,
    },
    /// Escape hatch for scripted one-offs; carries no core semantics.
    Special {
        name: String,
        magnitude: i32,
    },
}

/// Why an effect was skipped rather than applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    TargetDead,
    TargetAtFullHp,
    NotAUnit,
    NotATile,
    OutOfBounds,
}

/// Structured result of one effect application, carrying old and new values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApplyOutcome {
    Damage {
        planned: i32,
        dealt: i32,
        hp_before: i32,
        hp_after: i32,
        died: bool,
        damage_type: DamageType,
    },
    Heal {
        planned: i32,
        healed: i32,
        hp_before: i32,
        hp_after: i32,
    },
    Resource {
        resource: ResourceKind,
        requested: i32,
        applied: i32,
        before: i32,
        after: i32,
    },
    StatModifier {
        attribute: AttributeKind,
        amount: i32,
        percent: bool,
        duration: u32,
    },
    Status {
        kind: StatusKind,
        duration: u32,
    },
    Terrain {
        position: Position,
        before: TerrainKind,
        after: TerrainKind,
    },
    Special {
        name: String,
        magnitude: i32,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl ApplyOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, ApplyOutcome::Skipped { .. })
    }

    /// Damage dealt by this outcome, zero for everything else.
    pub fn damage_dealt(&self) -> i32 {
        match self {
            ApplyOutcome::Damage { dealt, .. } => *dealt,
            _ => 0,
        }
    }

    pub fn killed_target(&self) -> bool {
        matches!(self, ApplyOutcome::Damage { died: true, .. })
    }
}

impl Effect {
    /// True for kinds that resolve against a unit rather than a tile.
    pub fn targets_units(&self) -> bool {
        !matches!(self, Effect::TerrainChange { .. })
    }

    /// Whether this effect would do anything to `unit` right now.
    pub fn can_apply(&self, unit: &Unit) -> bool {
        match self {
            Effect::Damage { .. } => unit.is_alive(),
            Effect::Heal { .. } => unit.is_alive() && !unit.resources.hp.is_full(),
            Effect::ResourceChange { .. }
            | Effect::StatModifier { .. }
            | Effect::Status { .. } => unit.is_alive(),
            Effect::Special { .. } => true,
            Effect::TerrainChange { .. } => false,
        }
    }

    /// Applies this effect to a unit. Total: an inapplicable effect returns a
    /// skip record, never an error or panic.
    pub fn apply(&self, unit: &mut Unit, source: &str) -> ApplyOutcome {
        if !self.can_apply(unit) {
            return ApplyOutcome::Skipped {
                reason: self.skip_reason(unit),
            };
        }
        match self {
            Effect::Damage {
                magnitude,
                damage_type,
            } => {
                let outcome = unit.take_damage(*magnitude, *damage_type);
                ApplyOutcome::Damage {
                    planned: *magnitude,
                    dealt: outcome.dealt,
                    hp_before: outcome.hp_before,
                    hp_after: outcome.hp_after,
                    died: outcome.died,
                    damage_type: *damage_type,
                }
            }
            Effect::Heal { magnitude } => {
                let hp_before = unit.resources.hp.current();
                let healed = unit.heal(*magnitude);
                ApplyOutcome::Heal {
                    planned: *magnitude,
                    healed,
                    hp_before,
                    hp_after: unit.resources.hp.current(),
                }
            }
            Effect::ResourceChange { resource, amount } => {
                let pool = unit.resources.pool_mut(*resource);
                let before = pool.current();
                let applied = pool.adjust(*amount);
                ApplyOutcome::Resource {
                    resource: *resource,
                    requested: *amount,
                    applied,
                    before,
                    after: before + applied,
                }
            }
            Effect::StatModifier {
                attribute,
                amount,
                percent,
                duration,
            } => {
                unit.statuses.add_modifier(AttributeModifier {
                    attribute: *attribute,
                    delta: *amount,
                    percent: *percent,
                    turns_remaining: *duration,
                    source: source.to_string(),
                });
                ApplyOutcome::StatModifier {
                    attribute: *attribute,
                    amount: *amount,
                    percent: *percent,
                    duration: *duration,
                }
            }
            Effect::Status { kind, duration } => {
                unit.statuses.add_status(StatusInstance {
                    kind: *kind,
                    turns_remaining: *duration,
                    source: source.to_string(),
                });
                ApplyOutcome::Status {
                    kind: *kind,
                    duration: *duration,
                }
            }
            Effect::Special { name, magnitude } => ApplyOutcome::Special {
                name: name.clone(),
                magnitude: *magnitude,
            },
            Effect::TerrainChange { .. } => ApplyOutcome::Skipped {
                reason: SkipReason::NotATile,
            },
        }
    }

    /// Non-mutating twin of [`Effect::apply`]: predicts the outcome for
    /// previews, using the same arithmetic.
    pub fn predict(&self, unit: &Unit) -> ApplyOutcome {
        if !self.can_apply(unit) {
            return ApplyOutcome::Skipped {
                reason: self.skip_reason(unit),
            };
        }
        match self {
            Effect::Damage {
                magnitude,
                damage_type,
            } => {
                let reduced = match damage_type {
                    DamageType::True => *magnitude,
                    _ => (*magnitude - unit.defense_against(*damage_type)).max(1),
                };
                let hp_before = unit.resources.hp.current();
                let hp_after = (hp_before - reduced).max(0);
                ApplyOutcome::Damage {
                    planned: *magnitude,
                    dealt: hp_before - hp_after,
                    hp_before,
                    hp_after,
                    died: unit.is_alive() && hp_after == 0,
                    damage_type: *damage_type,
                }
            }
            Effect::Heal { magnitude } => {
                let hp_before = unit.resources.hp.current();
                let hp_after = (hp_before + (*magnitude).max(0)).min(unit.resources.hp.max());
                ApplyOutcome::Heal {
                    planned: *magnitude,
                    healed: hp_after - hp_before,
                    hp_before,
                    hp_after,
                }
            }
            Effect::ResourceChange { resource, amount } => {
                let pool = unit.resources.pool(*resource);
                let before = pool.current();
                let after = (before + amount).clamp(0, pool.max());
                ApplyOutcome::Resource {
                    resource: *resource,
                    requested: *amount,
                    applied: after - before,
                    before,
                    after,
                }
            }
            Effect::StatModifier {
                attribute,
                amount,
                percent,
                duration,
            } => ApplyOutcome::StatModifier {
                attribute: *attribute,
                amount: *amount,
                percent: *percent,
                duration: *duration,
            },
            Effect::Status { kind, duration } => ApplyOutcome::Status {
                kind: *kind,
                duration: *duration,
            },
            Effect::Special { name, magnitude } => ApplyOutcome::Special {
                name: name.clone(),
                magnitude: *magnitude,
            },
            Effect::TerrainChange { .. } => ApplyOutcome::Skipped {
                reason: SkipReason::NotATile,
            },
        }
    }

    /// Applies a terrain change to a tile. Unit-targeted kinds skip.
    pub fn apply_to_tile(&self, grid: &mut Grid, position: Position) -> ApplyOutcome {
        match self {
            Effect::TerrainChange { terrain } => {
                let Some(before) = grid.cell(position).map(|c| c.terrain) else {
                    return ApplyOutcome::Skipped {
                        reason: SkipReason::OutOfBounds,
                    };
                };
                match grid.set_terrain(position, *terrain) {
                    Ok(()) => ApplyOutcome::Terrain {
                        position,
                        before,
                        after: *terrain,
                    },
                    Err(GridError::OutOfBounds(_)) => ApplyOutcome::Skipped {
                        reason: SkipReason::OutOfBounds,
                    },
                    Err(_) => ApplyOutcome::Skipped {
                        reason: SkipReason::NotATile,
                    },
                }
            }
            _ => ApplyOutcome::Skipped {
                reason: SkipReason::NotAUnit,
            },
        }
    }

    fn skip_reason(&self, unit: &Unit) -> SkipReason {
        match self {
            Effect::Heal { .. } if unit.is_alive() => SkipReason::TargetAtFullHp,
            Effect::TerrainChange { .. } => SkipReason::NotATile,
            _ => SkipReason::TargetDead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Faction, UnitId};
    use crate::units::UnitTemplate;

    fn unit(hp: i32, fortitude: i32, strength: i32) -> Unit {
        let template = UnitTemplate::builder("dummy", "Dummy")
            .health(hp)
            .attribute(AttributeKind::Fortitude, fortitude)
            .attribute(AttributeKind::Strength, strength)
            .build();
        Unit::from_template(UnitId(7), Faction::Enemy, &template)
    }

    #[test]
    fn damage_apply_matches_predict() {
        let mut target = unit(30, 5, 3);
        let effect = Effect::Damage {
            magnitude: 12,
            damage_type: DamageType::Physical,
        };

        let predicted = effect.predict(&target);
        let applied = effect.apply(&mut target, "basic_strike");
        assert_eq!(predicted, applied);
        // defense = (3 + 5) / 2 = 4 → 8 dealt
        assert_eq!(applied.damage_dealt(), 8);
    }

    #[test]
    fn heal_at_full_hp_is_skipped() {
        let mut target = unit(30, 5, 3);
        let effect = Effect::Heal { magnitude: 10 };
        assert!(!effect.can_apply(&target));
        assert_eq!(
            effect.apply(&mut target, "mend"),
            ApplyOutcome::Skipped {
                reason: SkipReason::TargetAtFullHp
            }
        );
    }

    #[test]
    fn damage_on_corpse_is_skipped() {
        let mut target = unit(10, 0, 0);
        target.take_damage(99, DamageType::True);
        let effect = Effect::Damage {
            magnitude: 5,
            damage_type: DamageType::Physical,
        };
        assert!(effect.apply(&mut target, "strike").is_skip());
    }

    #[test]
    fn resource_change_reports_old_and_new() {
        let mut target = unit(30, 5, 3);
        target.resources.mp.set(2);
        let effect = Effect::ResourceChange {
            resource: ResourceKind::Mp,
            amount: 10,
        };
        let outcome = effect.apply(&mut target, "meditate");
        match outcome {
            ApplyOutcome::Resource {
                before,
                after,
                applied,
                ..
            } => {
                assert_eq!(before, 2);
                assert_eq!(after, target.resources.mp.current());
                assert_eq!(applied, after - before);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn terrain_change_round_trips_through_grid() {
        let mut grid = Grid::open(3, 3);
        let effect = Effect::TerrainChange {
            terrain: TerrainKind::Hazard,
        };
        let outcome = effect.apply_to_tile(&mut grid, Position::new(1, 1));
        assert_eq!(
            outcome,
            ApplyOutcome::Terrain {
                position: Position::new(1, 1),
                before: TerrainKind::Normal,
                after: TerrainKind::Hazard,
            }
        );
        assert_eq!(
            grid.cell(Position::new(1, 1)).map(|c| c.terrain),
            Some(TerrainKind::Hazard)
        );
    }

    #[test]
    fn status_effect_lands_on_board() {
        let mut target = unit(30, 5, 3);
        let effect = Effect::Status {
            kind: StatusKind::Stunned,
            duration: 2,
        };
        effect.apply(&mut target, "concussive_blow");
        assert!(target.statuses.has(StatusKind::Stunned));
    }
}
