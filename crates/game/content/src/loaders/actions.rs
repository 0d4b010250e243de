//! Action registration file loader.
//!
//! Files are RON lists of entries. Each entry supplies identity and metadata,
//! a cost object with the recognized keys (`mp_cost`, `ap_cost`, `rage_cost`,
//! `kwan_cost`, `item_quantity`, `talent_points` — unknown keys are ignored
//! with a warning), an effects object in the controlled vocabulary, and the
//! scheduling fields the queue needs.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use battle_core::{
    ActionBuilder, ActionCosts, ActionDefinition, ActionKind, ActionRegistry, AttributeKind,
    PriorityClass, Requirements, TargetType, TargetingSpec,
};

use super::effect_keys::{EffectValue, parse_effects};
use super::ContentError;

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TargetingEntry {
    range: Option<u32>,
    area_of_effect: Option<u32>,
    target_type: Option<String>,
    requires_line_of_sight: Option<bool>,
    can_target_empty_tiles: Option<bool>,
    max_targets: Option<u32>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RequirementsEntry {
    level: u32,
    attributes: BTreeMap<String, i32>,
    talents: BTreeSet<String>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
struct ActionEntry {
    id: String,
    name: String,
    kind: String,
    tier: String,
    level: u32,
    description: String,
    targeting: TargetingEntry,
    cost: BTreeMap<String, i32>,
    effects: BTreeMap<String, EffectValue>,
    requirements: RequirementsEntry,
    priority: String,
    initiative_bonus: i32,
    cast_time: u32,
    cooldown: u32,
    accuracy: u32,
    guaranteed_hit: bool,
    can_critical: bool,
}

impl Default for ActionEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: "Attack".into(),
            tier: "BASE".into(),
            level: 1,
            description: String::new(),
            targeting: TargetingEntry::default(),
            cost: BTreeMap::new(),
            effects: BTreeMap::new(),
            requirements: RequirementsEntry::default(),
            priority: "Normal".into(),
            initiative_bonus: 0,
            cast_time: 0,
            cooldown: 0,
            accuracy: 100,
            guaranteed_hit: false,
            can_critical: true,
        }
    }
}

const RECOGNIZED_COST_KEYS: &[&str] = &[
    "mp_cost",
    "ap_cost",
    "rage_cost",
    "kwan_cost",
    "item_quantity",
    "talent_points",
];

fn convert_costs(source: &str, cost: &BTreeMap<String, i32>) -> ActionCosts {
    for key in cost.keys() {
        if !RECOGNIZED_COST_KEYS.contains(&key.as_str()) {
            tracing::warn!(action = source, key = %key, "unknown cost key ignored");
        }
    }
    let get = |key: &str| cost.get(key).copied().unwrap_or(0);
    ActionCosts {
        mp: get("mp_cost"),
        ap: get("ap_cost"),
        rage: get("rage_cost"),
        kwan: get("kwan_cost"),
        item_quantity: get("item_quantity").max(0) as u32,
        talent_points: get("talent_points").max(0) as u32,
    }
}

fn convert_entry(entry: ActionEntry) -> Result<ActionDefinition, ContentError> {
    let reject = |what: &str, value: &str| ContentError::BadEntry {
        id: entry.id.clone(),
        message: format!("unknown {what} '{value}'"),
    };

    let kind = ActionKind::from_str(&entry.kind).map_err(|_| reject("kind", &entry.kind))?;
    let priority =
        PriorityClass::from_str(&entry.priority).map_err(|_| reject("priority", &entry.priority))?;

    let defaults = TargetingSpec::default();
    let target_type = match &entry.targeting.target_type {
        Some(raw) => TargetType::from_str(raw).map_err(|_| reject("target_type", raw))?,
        None => defaults.target_type,
    };
    let targeting = TargetingSpec {
        range: entry.targeting.range.unwrap_or(defaults.range),
        area_of_effect: entry
            .targeting
            .area_of_effect
            .unwrap_or(defaults.area_of_effect),
        target_type,
        requires_line_of_sight: entry
            .targeting
            .requires_line_of_sight
            .unwrap_or(defaults.requires_line_of_sight),
        can_target_empty_tiles: entry
            .targeting
            .can_target_empty_tiles
            .unwrap_or(defaults.can_target_empty_tiles),
        max_targets: entry.targeting.max_targets.unwrap_or(defaults.max_targets),
    };

    let mut attributes = BTreeMap::new();
    for (name, floor) in &entry.requirements.attributes {
        let attribute = AttributeKind::from_str(name).map_err(|_| reject("attribute", name))?;
        attributes.insert(attribute, *floor);
    }
    let requirements = Requirements {
        min_level: entry.requirements.level,
        attributes,
        talents: entry.requirements.talents.clone(),
    };

    let effects = parse_effects(&entry.effects).map_err(|error| ContentError::BadEntry {
        id: entry.id.clone(),
        message: error.to_string(),
    })?;

    let mut builder = ActionBuilder::new(&entry.id, &entry.name, kind)
        .description(&entry.description)
        .tier(&entry.tier)
        .level(entry.level)
        .targeting(targeting)
        .costs(convert_costs(&entry.id, &entry.cost))
        .requirements(requirements)
        .priority(priority)
        .initiative_bonus(entry.initiative_bonus)
        .cast_time(entry.cast_time)
        .cooldown(entry.cooldown)
        .accuracy(entry.accuracy);
    if entry.guaranteed_hit {
        builder = builder.guaranteed_hit();
    }
    if !entry.can_critical {
        builder = builder.no_critical();
    }
    for effect in effects {
        builder = builder.effect(effect);
    }
    Ok(builder.build())
}

/// Parses one registration file.
///
/// `strict` distinguishes startup (any bad entry fails the whole file) from
/// runtime reloads (bad entries are logged and dropped).
pub fn load_action_entries(ron_text: &str, strict: bool) -> Result<Vec<ActionDefinition>, ContentError> {
    let options = ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME);
    let entries: Vec<ActionEntry> = options
        .from_str(ron_text)
        .map_err(|error| ContentError::Parse(error.to_string()))?;

    let mut actions = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.id.is_empty() {
            let error = ContentError::BadEntry {
                id: "<missing>".into(),
                message: "entry has no id".into(),
            };
            if strict {
                return Err(error);
            }
            tracing::warn!(%error, "action entry dropped");
            continue;
        }
        match convert_entry(entry) {
            Ok(action) => actions.push(action),
            Err(error) if strict => return Err(error),
            Err(error) => tracing::warn!(%error, "action entry dropped"),
        }
    }
    Ok(actions)
}

/// Loads the embedded default action set into a frozen registry.
pub fn default_action_registry() -> Result<ActionRegistry, ContentError> {
    let mut registry = ActionRegistry::new();
    for source in [
        include_str!("../../data/actions/basic.ron"),
        include_str!("../../data/actions/magic.ron"),
        include_str!("../../data/actions/spirit.ron"),
    ] {
        for action in load_action_entries(source, true)? {
            registry
                .register(action)
                .map_err(|error| ContentError::Parse(error.to_string()))?;
        }
    }
    registry.freeze();
    Ok(registry)
}
