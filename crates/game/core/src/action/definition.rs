//! Immutable action definitions.
//!
//! A definition carries everything needed to validate, preview, and execute
//! without consulting its authoring file again. Definitions are registered at
//! startup and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};

use crate::effect::Effect;
use crate::queue::PriorityClass;
use crate::units::{AttributeKind, Unit};

use super::cost::ActionCosts;
use super::targeting::TargetingSpec;

/// Visual/UI classification of actions.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    #[default]
    Attack,
    Magic,
    Spirit,
    Move,
    Inventory,
    Passive,
}

/// Static gates a caster must clear before using an action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Requirements {
    pub min_level: u32,
    /// Attribute floors: effective value must reach each entry.
    pub attributes: BTreeMap<AttributeKind, i32>,
    /// Talents the caster must have unlocked.
    pub talents: BTreeSet<String>,
}

impl Requirements {
    pub fn none() -> Self {
        Self::default()
    }

    /// First unmet requirement, rendered for diagnostics.
    pub fn first_unmet(&self, unit: &Unit) -> Option<String> {
        if unit.level < self.min_level {
            return Some(format!("level {} required", self.min_level));
        }
        for (&attribute, &floor) in &self.attributes {
            if unit.effective_attribute(attribute) < floor {
                return Some(format!("{attribute} {floor} required"));
            }
        }
        self.talents
            .iter()
            .find(|talent| !unit.has_talent(talent))
            .map(|talent| format!("talent '{talent}' required"))
    }

    pub fn met_by(&self, unit: &Unit) -> bool {
        self.first_unmet(unit).is_none()
    }
}

/// One registered action. Immutable after registration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub kind: ActionKind,
    pub description: String,
    pub tier: String,
    pub level: u32,

    pub targeting: TargetingSpec,
    pub costs: ActionCosts,
    /// Applied in order to each resolved target.
    pub effects: Vec<Effect>,
    pub requirements: Requirements,

    pub priority: PriorityClass,
    pub initiative_bonus: i32,
    /// Delay in initiative ticks between queueing and execution.
    pub cast_time: u32,
    pub cooldown: u32,

    /// Hit chance 0-100; ignored when `guaranteed_hit` is set.
    pub accuracy: u32,
    pub guaranteed_hit: bool,
    pub can_critical: bool,
}

impl ActionDefinition {
    pub fn builder(id: impl Into<String>, name: impl Into<String>, kind: ActionKind) -> ActionBuilder {
        ActionBuilder::new(id, name, kind)
    }
}

/// Builder used by loaders and tests.
#[derive(Clone, Debug)]
pub struct ActionBuilder {
    action: ActionDefinition,
}

impl ActionBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            action: ActionDefinition {
                id: id.into(),
                name: name.into(),
                kind,
                description: String::new(),
                tier: "BASE".into(),
                level: 1,
                targeting: TargetingSpec::default(),
                costs: ActionCosts::default(),
                effects: Vec::new(),
                requirements: Requirements::none(),
                priority: PriorityClass::Normal,
                initiative_bonus: 0,
                cast_time: 0,
                cooldown: 0,
                accuracy: 100,
                guaranteed_hit: false,
                can_critical: true,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.action.description = description.into();
        self
    }

    pub fn tier(mut self, tier: impl Into<String>) -> Self {
        self.action.tier = tier.into();
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.action.level = level;
        self
    }

    pub fn targeting(mut self, targeting: TargetingSpec) -> Self {
        self.action.targeting = targeting;
        self
    }

    pub fn costs(mut self, costs: ActionCosts) -> Self {
        self.action.costs = costs;
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.action.effects.push(effect);
        self
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.action.requirements = requirements;
        self
    }

    pub fn priority(mut self, priority: PriorityClass) -> Self {
        self.action.priority = priority;
        self
    }

    pub fn initiative_bonus(mut self, bonus: i32) -> Self {
        self.action.initiative_bonus = bonus;
        self
    }

    pub fn cast_time(mut self, cast_time: u32) -> Self {
        self.action.cast_time = cast_time;
        self
    }

    pub fn cooldown(mut self, cooldown: u32) -> Self {
        self.action.cooldown = cooldown;
        self
    }

    pub fn accuracy(mut self, accuracy: u32) -> Self {
        self.action.accuracy = accuracy.min(100);
        self
    }

    pub fn guaranteed_hit(mut self) -> Self {
        self.action.guaranteed_hit = true;
        self
    }

    pub fn no_critical(mut self) -> Self {
        self.action.can_critical = false;
        self
    }

    pub fn build(self) -> ActionDefinition {
        self.action
    }
}
