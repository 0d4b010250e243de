//! Immutable unit templates.
//!
//! A template is the static half of a unit: base attributes, resource maxima,
//! starting talents, hotkey bindings, starting equipment. Battle instances are
//! stamped out of templates at battle start and never write back.

use std::collections::BTreeSet;

use crate::config::BattleConfig;
use crate::types::Faction;

use super::attributes::{AttributeKind, Attributes};
use super::equipment::{EquipmentSlot, EquippedItem};

/// Hotkey bar binding: slot index → action identifier.
pub type HotkeyBar = [Option<String>; BattleConfig::HOTKEY_SLOTS];

/// Static description a unit is instantiated from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitTemplate {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    pub base_health: i32,
    pub base_mp: i32,
    pub base_move_points: u32,
    pub base_attack_range: u32,
    pub base_effect_area: u32,
    pub max_rage: i32,
    pub max_kwan: i32,
    /// Talents already unlocked when the unit enters battle.
    pub starting_talents: BTreeSet<String>,
    pub starting_equipment: Vec<(EquipmentSlot, EquippedItem)>,
    pub hotkeys: HotkeyBar,
}

impl UnitTemplate {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> UnitTemplateBuilder {
        UnitTemplateBuilder::new(id, name)
    }
}

/// Builder mirroring the template file fields.
#[derive(Clone, Debug)]
pub struct UnitTemplateBuilder {
    template: UnitTemplate,
}

impl UnitTemplateBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            template: UnitTemplate {
                id: id.into(),
                name: name.into(),
                attributes: Attributes::BASELINE,
                base_health: 80,
                base_mp: 5,
                base_move_points: 3,
                base_attack_range: 1,
                base_effect_area: 1,
                max_rage: 100,
                max_kwan: 100,
                starting_talents: BTreeSet::new(),
                starting_equipment: Vec::new(),
                hotkeys: Default::default(),
            },
        }
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.template.attributes = attributes;
        self
    }

    pub fn attribute(mut self, kind: AttributeKind, value: i32) -> Self {
        self.template.attributes.set(kind, value);
        self
    }

    /// Marks an attribute as specialized: +5 over the baseline.
    pub fn attribute_bonus(mut self, kind: AttributeKind) -> Self {
        self.template.attributes.add(kind, 5);
        self
    }

    pub fn health(mut self, base_health: i32) -> Self {
        self.template.base_health = base_health;
        self
    }

    pub fn mp(mut self, base_mp: i32) -> Self {
        self.template.base_mp = base_mp;
        self
    }

    pub fn move_points(mut self, base_move_points: u32) -> Self {
        self.template.base_move_points = base_move_points;
        self
    }

    pub fn attack_range(mut self, base_attack_range: u32) -> Self {
        self.template.base_attack_range = base_attack_range;
        self
    }

    pub fn effect_area(mut self, base_effect_area: u32) -> Self {
        self.template.base_effect_area = base_effect_area;
        self
    }

    pub fn talent(mut self, id: impl Into<String>) -> Self {
        self.template.starting_talents.insert(id.into());
        self
    }

    pub fn equipment(mut self, slot: EquipmentSlot, item: EquippedItem) -> Self {
        self.template.starting_equipment.push((slot, item));
        self
    }

    /// Binds a hotkey slot (0-based). Out-of-range slots are ignored with a
    /// warning; template files use "1".."8".
    pub fn hotkey(mut self, slot: usize, action: impl Into<String>) -> Self {
        match self.template.hotkeys.get_mut(slot) {
            Some(binding) => *binding = Some(action.into()),
            None => tracing::warn!(slot, "hotkey slot out of range, binding ignored"),
        }
        self
    }

    pub fn build(self) -> UnitTemplate {
        self.template
    }
}

/// Where and for whom a template is placed at battle start.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitPlacement {
    pub template_id: String,
    pub faction: Faction,
    pub position: crate::types::Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_specialization_bonus() {
        let template = UnitTemplate::builder("heromancer", "Heromancer")
            .attribute_bonus(AttributeKind::Wisdom)
            .attribute_bonus(AttributeKind::Wonder)
            .build();

        assert_eq!(template.attributes.wisdom, 15);
        assert_eq!(template.attributes.wonder, 15);
        assert_eq!(template.attributes.strength, 10);
    }

    #[test]
    fn out_of_range_hotkey_is_ignored() {
        let template = UnitTemplate::builder("t", "T")
            .hotkey(0, "strike")
            .hotkey(99, "fireball")
            .build();

        assert_eq!(template.hotkeys[0].as_deref(), Some("strike"));
        assert!(template.hotkeys.iter().skip(1).all(Option::is_none));
    }
}
