//! Temporary statuses and attribute modifiers.
//!
//! Two flavours of timed state live here:
//! - [`AttributeModifier`]: a sparse `{attribute, delta, percent}` record the
//!   effective-stat fold sums over.
//! - [`StatusInstance`]: a named condition whose interpretation belongs to the
//!   turn controller (stunned units skip their slot, poison ticks at
//!   turn-end, and so on).
//!
//! Both age by one at turn-start; expired entries are dropped in place.

use arrayvec::ArrayVec;

use crate::config::BattleConfig;

use super::attributes::AttributeKind;

/// Named conditions with controller-defined semantics.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusKind {
    /// Skips the unit's action slot entirely.
    Stunned,
    /// Cannot move; other actions unaffected.
    Rooted,
    /// Cannot use Magic-kind actions.
    Silenced,
    /// Loses HP at turn-end.
    Poisoned,
    /// Recovers HP at turn-end.
    Regenerating,
    /// Defense bonus applied by the damage pipeline.
    Shielded,
}

/// A named status with its remaining duration in turns.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusInstance {
    pub kind: StatusKind,
    pub turns_remaining: u32,
    /// Action that applied this status.
    pub source: String,
}

/// A timed attribute adjustment.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeModifier {
    pub attribute: AttributeKind,
    pub delta: i32,
    /// When set, `delta` is a percentage of the base value.
    pub percent: bool,
    pub turns_remaining: u32,
    pub source: String,
}

/// Ordered board of everything temporary on one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusBoard {
    statuses: ArrayVec<StatusInstance, { BattleConfig::MAX_STATUS_EFFECTS }>,
    modifiers: ArrayVec<AttributeModifier, { BattleConfig::MAX_STATUS_EFFECTS }>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named status. An existing instance of the same kind is extended
    /// to the longer duration instead of stacking.
    pub fn add_status(&mut self, instance: StatusInstance) {
        if let Some(existing) = self.statuses.iter_mut().find(|s| s.kind == instance.kind) {
            existing.turns_remaining = existing.turns_remaining.max(instance.turns_remaining);
            return;
        }
        if self.statuses.try_push(instance).is_err() {
            tracing::warn!("status board full, new status dropped");
        }
    }

    /// Pushes an attribute modifier. Modifiers from different sources stack.
    pub fn add_modifier(&mut self, modifier: AttributeModifier) {
        if self.modifiers.try_push(modifier).is_err() {
            tracing::warn!("status board full, new modifier dropped");
        }
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind)
    }

    pub fn statuses(&self) -> impl Iterator<Item = &StatusInstance> {
        self.statuses.iter()
    }

    pub fn modifiers(&self) -> impl Iterator<Item = &AttributeModifier> {
        self.modifiers.iter()
    }

    /// `(flat_sum, percent_sum)` for one attribute.
    pub fn fold_attribute(&self, attribute: AttributeKind) -> (i32, i32) {
        self.modifiers
            .iter()
            .filter(|m| m.attribute == attribute)
            .fold((0, 0), |(flat, pct), m| {
                if m.percent {
                    (flat, pct + m.delta)
                } else {
                    (flat + m.delta, pct)
                }
            })
    }

    /// Ages everything by one turn and drops expired entries.
    pub fn tick(&mut self) {
        for status in &mut self.statuses {
            status.turns_remaining = status.turns_remaining.saturating_sub(1);
        }
        for modifier in &mut self.modifiers {
            modifier.turns_remaining = modifier.turns_remaining.saturating_sub(1);
        }
        self.statuses.retain(|s| s.turns_remaining > 0);
        self.modifiers.retain(|m| m.turns_remaining > 0);
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
        self.modifiers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.modifiers.is_empty()
    }
}
