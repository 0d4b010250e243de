//! Targeting descriptors: who an action may legally affect.

use crate::types::{Position, UnitId};

/// Legal target policy for an action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetType {
    /// Exactly the caster itself.
    #[strum(serialize = "self")]
    #[cfg_attr(feature = "serde", serde(rename = "self"))]
    SelfOnly,
    /// Units sharing the caster's faction.
    #[strum(serialize = "ally")]
    #[cfg_attr(feature = "serde", serde(rename = "ally"))]
    Ally,
    /// Units of any other faction.
    #[default]
    #[strum(serialize = "enemy")]
    #[cfg_attr(feature = "serde", serde(rename = "enemy"))]
    Enemy,
    /// Any unit regardless of faction.
    #[strum(serialize = "any")]
    #[cfg_attr(feature = "serde", serde(rename = "any"))]
    Any,
    /// A grid tile, occupied or not.
    #[strum(serialize = "tile")]
    #[cfg_attr(feature = "serde", serde(rename = "tile"))]
    Tile,
    /// An area center; affected units are resolved at execution time.
    #[strum(serialize = "area")]
    #[cfg_attr(feature = "serde", serde(rename = "area"))]
    Area,
}

impl TargetType {
    /// Whether a unit of `target_faction` is admissible for a caster of
    /// `caster_faction`. Tile-flavoured policies admit every unit caught in
    /// the area.
    pub fn admits(
        self,
        caster: UnitId,
        caster_faction: crate::types::Faction,
        target: UnitId,
        target_faction: crate::types::Faction,
    ) -> bool {
        match self {
            TargetType::SelfOnly => caster == target,
            TargetType::Ally => caster_faction.is_ally_of(target_faction),
            TargetType::Enemy => !caster_faction.is_ally_of(target_faction),
            TargetType::Any | TargetType::Tile | TargetType::Area => true,
        }
    }
}

/// Configuration for how an action targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetingSpec {
    /// Maximum Manhattan distance from caster to each declared target.
    pub range: u32,
    /// Manhattan radius around each center; 0 disables area resolution.
    pub area_of_effect: u32,
    pub target_type: TargetType,
    pub requires_line_of_sight: bool,
    pub can_target_empty_tiles: bool,
    pub max_targets: u32,
}

impl TargetingSpec {
    pub fn melee() -> Self {
        Self::default()
    }

    pub fn ranged(range: u32) -> Self {
        Self {
            range,
            requires_line_of_sight: true,
            ..Self::default()
        }
    }

    pub fn area(range: u32, radius: u32) -> Self {
        Self {
            range,
            area_of_effect: radius,
            target_type: TargetType::Area,
            can_target_empty_tiles: true,
            ..Self::default()
        }
    }
}

impl Default for TargetingSpec {
    fn default() -> Self {
        Self {
            range: 1,
            area_of_effect: 0,
            target_type: TargetType::Enemy,
            requires_line_of_sight: false,
            can_target_empty_tiles: false,
            max_targets: 1,
        }
    }
}

/// A declared target: either a unit or a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionTarget {
    Unit(UnitId),
    Tile(Position),
}

impl ActionTarget {
    pub fn unit(self) -> Option<UnitId> {
        match self {
            ActionTarget::Unit(id) => Some(id),
            ActionTarget::Tile(_) => None,
        }
    }

    pub fn tile(self) -> Option<Position> {
        match self {
            ActionTarget::Tile(position) => Some(position),
            ActionTarget::Unit(_) => None,
        }
    }
}
