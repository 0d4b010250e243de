//! Unit template file loader.
//!
//! Template files carry a `stats` block (base pools, movement, range, and a
//! list of attributes specialized at +5), starting inventory, a talent map,
//! and hotkey bindings keyed "1".."8".

use std::collections::BTreeMap;
use std::str::FromStr;

use battle_core::{AttributeKind, EquipmentSlot, EquippedItem, UnitTemplate};

use super::ContentError;

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
struct StatsEntry {
    base_health: i32,
    base_mp: i32,
    base_move_points: u32,
    base_attack_range: u32,
    base_effect_area: u32,
    attribute_bonuses: Vec<String>,
}

impl Default for StatsEntry {
    fn default() -> Self {
        Self {
            base_health: 80,
            base_mp: 5,
            base_move_points: 3,
            base_attack_range: 1,
            base_effect_area: 1,
            attribute_bonuses: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ItemEntry {
    id: String,
    name: String,
    slot: String,
    equipped: bool,
    bonuses: BTreeMap<String, i32>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct InventoryEntry {
    starting_items: Vec<ItemEntry>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TalentEntry {
    unlocked: bool,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct HotkeyEntry {
    talent_id: String,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UnitEntry {
    id: String,
    name: String,
    stats: StatsEntry,
    inventory: InventoryEntry,
    talents: BTreeMap<String, TalentEntry>,
    hotkey_abilities: BTreeMap<String, HotkeyEntry>,
}

fn convert_entry(entry: UnitEntry) -> Result<UnitTemplate, ContentError> {
    let reject = |what: &str, value: &str| ContentError::BadEntry {
        id: entry.id.clone(),
        message: format!("unknown {what} '{value}'"),
    };

    let mut builder = UnitTemplate::builder(&entry.id, &entry.name)
        .health(entry.stats.base_health)
        .mp(entry.stats.base_mp)
        .move_points(entry.stats.base_move_points)
        .attack_range(entry.stats.base_attack_range)
        .effect_area(entry.stats.base_effect_area);

    for name in &entry.stats.attribute_bonuses {
        let attribute = AttributeKind::from_str(name).map_err(|_| reject("attribute", name))?;
        builder = builder.attribute_bonus(attribute);
    }

    for item in &entry.inventory.starting_items {
        if !item.equipped {
            continue;
        }
        let slot = EquipmentSlot::from_str(&item.slot).map_err(|_| reject("slot", &item.slot))?;
        let mut equipped = EquippedItem::new(&item.id, &item.name);
        for (attribute, bonus) in &item.bonuses {
            let kind =
                AttributeKind::from_str(attribute).map_err(|_| reject("attribute", attribute))?;
            equipped = equipped.with_bonus(kind, *bonus);
        }
        builder = builder.equipment(slot, equipped);
    }

    for (talent_id, talent) in &entry.talents {
        if talent.unlocked {
            builder = builder.talent(talent_id);
        }
    }

    for (slot_key, hotkey) in &entry.hotkey_abilities {
        let slot: usize = slot_key
            .parse()
            .map_err(|_| reject("hotkey slot", slot_key))?;
        if slot == 0 {
            return Err(reject("hotkey slot", slot_key));
        }
        builder = builder.hotkey(slot - 1, &hotkey.talent_id);
    }

    Ok(builder.build())
}

/// Parses one template file: id → template.
pub fn load_unit_templates(
    ron_text: &str,
) -> Result<BTreeMap<String, UnitTemplate>, ContentError> {
    let entries: Vec<UnitEntry> =
        ron::from_str(ron_text).map_err(|error| ContentError::Parse(error.to_string()))?;

    let mut templates = BTreeMap::new();
    for entry in entries {
        if entry.id.is_empty() {
            return Err(ContentError::BadEntry {
                id: "<missing>".into(),
                message: "entry has no id".into(),
            });
        }
        let template = convert_entry(entry)?;
        if templates.insert(template.id.clone(), template).is_some() {
            tracing::warn!("duplicate unit template overwritten");
        }
    }
    Ok(templates)
}

/// Embedded default archetypes.
pub fn default_unit_templates() -> Result<BTreeMap<String, UnitTemplate>, ContentError> {
    load_unit_templates(include_str!("../../data/units/archetypes.ron"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_archetypes_load() {
        let templates = default_unit_templates().unwrap();
        assert!(templates.len() >= 3);

        let heromancer = &templates["heromancer"];
        // Specialized attributes sit at baseline + 5.
        assert_eq!(heromancer.attributes.wisdom, 15);
        assert_eq!(heromancer.attributes.strength, 10);
        assert_eq!(heromancer.hotkeys[0].as_deref(), Some("basic_strike"));
    }

    #[test]
    fn equipped_items_carry_bonuses() {
        let text = r#"[(
            id: "test",
            name: "Test",
            inventory: (starting_items: [(
                id: "iron_sword",
                name: "Iron Sword",
                slot: "weapon",
                equipped: true,
                bonuses: {"strength": 3},
            )]),
        )]"#;
        let templates = load_unit_templates(text).unwrap();
        let (_, item) = templates["test"].starting_equipment[0].clone();
        assert_eq!(item.bonuses[&AttributeKind::Strength], 3);
    }

    #[test]
    fn hotkey_slots_are_one_based() {
        let text = r#"[(
            id: "test",
            name: "Test",
            hotkey_abilities: {"1": (talent_id: "strike"), "8": (talent_id: "guard")},
        )]"#;
        let templates = load_unit_templates(text).unwrap();
        assert_eq!(templates["test"].hotkeys[0].as_deref(), Some("strike"));
        assert_eq!(templates["test"].hotkeys[7].as_deref(), Some("guard"));
    }

    #[test]
    fn unknown_attribute_bonus_is_rejected() {
        let text = r#"[(
            id: "test",
            name: "Test",
            stats: (attribute_bonuses: ["charisma"]),
        )]"#;
        assert!(load_unit_templates(text).is_err());
    }
}
