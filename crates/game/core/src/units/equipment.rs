//! Equipment slots and their attribute bonuses.

use std::collections::BTreeMap;

use super::attributes::AttributeKind;

/// The three equipment slots a unit carries into battle.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EquipmentSlot {
    Weapon,
    Body,
    Accessory,
}

/// An item sitting in an equipment slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquippedItem {
    pub id: String,
    pub name: String,
    /// Flat attribute bonuses granted while equipped.
    pub bonuses: BTreeMap<AttributeKind, i32>,
}

impl EquippedItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bonuses: BTreeMap::new(),
        }
    }

    pub fn with_bonus(mut self, attribute: AttributeKind, value: i32) -> Self {
        self.bonuses.insert(attribute, value);
        self
    }
}

/// Per-slot equipment state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Equipment {
    slots: BTreeMap<EquipmentSlot, EquippedItem>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equips an item, returning whatever previously held the slot.
    pub fn equip(&mut self, slot: EquipmentSlot, item: EquippedItem) -> Option<EquippedItem> {
        self.slots.insert(slot, item)
    }

    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<EquippedItem> {
        self.slots.remove(&slot)
    }

    pub fn item(&self, slot: EquipmentSlot) -> Option<&EquippedItem> {
        self.slots.get(&slot)
    }

    /// Summed flat bonus for one attribute across all slots.
    pub fn bonus(&self, attribute: AttributeKind) -> i32 {
        self.slots
            .values()
            .filter_map(|item| item.bonuses.get(&attribute))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EquipmentSlot, &EquippedItem)> {
        self.slots.iter().map(|(slot, item)| (*slot, item))
    }
}
