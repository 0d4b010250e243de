//! Runtime unit state.
//!
//! A [`Unit`] combines an immutable template with everything that mutates
//! during battle. Effective stats are folded on every read from
//! `base + equipment + status modifiers + talent passives`; nothing derived
//! is cached across mutations.
//!
//! # Invariants
//!
//! - Resources stay within `[0, max]` (enforced by [`ResourcePool`]).
//! - `position` mirrors grid occupancy and is written only by the battle
//!   context's placement paths.
//! - `alive` is false exactly when HP is zero.

use std::collections::{BTreeMap, BTreeSet};

use crate::effect::DamageType;
use crate::grid::CostMilli;
use crate::types::{Faction, Position, UnitId};

use super::attributes::{AttributeKind, Attributes, DerivedStats};
use super::equipment::Equipment;
use super::resources::{ResourcePool, ResourceSet};
use super::status::{StatusBoard, StatusKind};
use super::template::{HotkeyBar, UnitTemplate};

/// Outcome of a single damage application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageOutcome {
    pub dealt: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub died: bool,
}

/// One combatant's full runtime state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub template_id: String,
    pub faction: Faction,
    /// None while off-board (dead or not yet placed).
    pub position: Option<Position>,

    pub resources: ResourceSet,
    /// Base attributes; read through [`Unit::effective_attribute`].
    pub attributes: Attributes,
    pub equipment: Equipment,
    pub statuses: StatusBoard,

    /// Flat attribute bonuses granted by unlocked passive talents.
    pub passive_bonuses: BTreeMap<AttributeKind, i32>,
    pub talents: BTreeSet<String>,
    pub talent_points: u32,

    /// Action identifier → remaining cooldown in turns.
    pub cooldowns: BTreeMap<String, u32>,
    pub hotkeys: HotkeyBar,

    pub level: u32,
    pub experience: u32,

    pub base_move_points: u32,
    /// Movement left this turn, in the grid's milli-point units.
    pub movement_remaining: CostMilli,
    pub base_attack_range: u32,
    pub base_effect_area: u32,

    pub alive: bool,
}

impl Unit {
    /// Stamps a battle instance out of a template.
    pub fn from_template(id: UnitId, faction: Faction, template: &UnitTemplate) -> Self {
        let mut equipment = Equipment::new();
        for (slot, item) in &template.starting_equipment {
            equipment.equip(*slot, item.clone());
        }

        Self {
            id,
            name: template.name.clone(),
            template_id: template.id.clone(),
            faction,
            position: None,
            resources: ResourceSet {
                hp: ResourcePool::full(template.base_health),
                mp: ResourcePool::full(template.base_mp),
                ap: ResourcePool::full(template.attributes.speed.max(0)),
                rage: ResourcePool::empty(template.max_rage),
                kwan: ResourcePool::empty(template.max_kwan),
            },
            attributes: template.attributes,
            equipment,
            statuses: StatusBoard::new(),
            passive_bonuses: BTreeMap::new(),
            talents: template.starting_talents.clone(),
            talent_points: 0,
            cooldowns: BTreeMap::new(),
            hotkeys: template.hotkeys.clone(),
            level: 1,
            experience: 0,
            base_move_points: template.base_move_points,
            movement_remaining: template.base_move_points * 1000,
            base_attack_range: template.base_attack_range,
            base_effect_area: template.base_effect_area,
            alive: true,
        }
    }

    // ========================================================================
    // Effective stats
    // ========================================================================

    /// `base + equipment + status modifiers + talent passives`, floored at 0.
    ///
    /// Percent modifiers apply to the base value, after flat bonuses are
    /// summed in.
    pub fn effective_attribute(&self, kind: AttributeKind) -> i32 {
        let base = self.attributes.get(kind);
        let (flat, percent) = self.statuses.fold_attribute(kind);
        let passives = self.passive_bonuses.get(&kind).copied().unwrap_or(0);
        let total = base + self.equipment.bonus(kind) + flat + passives;
        let scaled = total + (base * percent) / 100;
        scaled.max(0)
    }

    fn effective_attributes(&self) -> Attributes {
        let mut out = Attributes::uniform(0);
        for kind in <AttributeKind as strum::IntoEnumIterator>::iter() {
            out.set(kind, self.effective_attribute(kind));
        }
        out
    }

    /// Derived combat stats from the effective attribute block.
    pub fn derived(&self) -> DerivedStats {
        DerivedStats::compute(&self.effective_attributes())
    }

    /// Execution-order initiative. Per-action bonuses are added at queue time.
    pub fn initiative(&self) -> i32 {
        self.derived().initiative
    }

    /// Defense consulted by the damage pipeline; `Shielded` adds a flat 2.
    pub fn defense_against(&self, damage_type: DamageType) -> i32 {
        let derived = self.derived();
        let base = match damage_type {
            DamageType::Physical => derived.physical_defense,
            DamageType::Magical => derived.magical_defense,
            DamageType::Spiritual => derived.spiritual_defense,
            DamageType::True => return 0,
        };
        if self.statuses.has(StatusKind::Shielded) {
            base + 2
        } else {
            base
        }
    }

    // ========================================================================
    // Resource mutation
    // ========================================================================

    /// Applies typed damage: `max(1, amount − defense)`, True damage ignores
    /// defense entirely. Sets `alive = false` at zero HP; the caller clears
    /// the grid cell.
    pub fn take_damage(&mut self, amount: i32, damage_type: DamageType) -> DamageOutcome {
        let reduced = match damage_type {
            DamageType::True => amount,
            _ => (amount - self.defense_against(damage_type)).max(1),
        };
        let hp_before = self.resources.hp.current();
        self.resources.hp.adjust(-reduced);
        let hp_after = self.resources.hp.current();
        let died = self.alive && hp_after == 0;
        if died {
            self.alive = false;
        }
        DamageOutcome {
            dealt: hp_before - hp_after,
            hp_before,
            hp_after,
            died,
        }
    }

    /// Restores HP, clamped at maximum. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.resources.hp.adjust(amount.max(0))
    }

    // ========================================================================
    // Cooldowns & availability
    // ========================================================================

    pub fn cooldown_of(&self, action_id: &str) -> u32 {
        self.cooldowns.get(action_id).copied().unwrap_or(0)
    }

    pub fn set_cooldown(&mut self, action_id: &str, turns: u32) {
        if turns == 0 {
            self.cooldowns.remove(action_id);
        } else {
            self.cooldowns.insert(action_id.to_string(), turns);
        }
    }

    pub fn has_talent(&self, talent_id: &str) -> bool {
        self.talents.contains(talent_id)
    }

    /// Unlocks a talent, spending points and applying its passive bonuses.
    pub fn unlock_talent(
        &mut self,
        talent_id: &str,
        cost: u32,
        passives: &BTreeMap<AttributeKind, i32>,
    ) -> bool {
        if self.talents.contains(talent_id) || self.talent_points < cost {
            return false;
        }
        self.talent_points -= cost;
        self.talents.insert(talent_id.to_string());
        for (&kind, &bonus) in passives {
            *self.passive_bonuses.entry(kind).or_insert(0) += bonus;
        }
        true
    }

    // ========================================================================
    // Turn lifecycle
    // ========================================================================

    /// Turn-start maintenance: AP back to speed, movement restored, cooldowns
    /// and status durations decremented. Runs even while stunned; the stun
    /// only blocks the action slot itself.
    pub fn begin_turn(&mut self) {
        let speed = self.effective_attribute(AttributeKind::Speed);
        self.resources.ap.set_max(speed);
        self.resources.ap.set(speed);
        self.movement_remaining = self.max_movement();
        for remaining in self.cooldowns.values_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        self.cooldowns.retain(|_, remaining| *remaining > 0);
        self.statuses.tick();
    }

    /// Maximum movement for one turn, in milli-points.
    pub fn max_movement(&self) -> CostMilli {
        self.base_move_points * 1000
    }

    /// Remaining movement expressed in movement points.
    pub fn movement_points(&self) -> f32 {
        self.movement_remaining as f32 / 1000.0
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::template::UnitTemplate;

    fn sample() -> Unit {
        let template = UnitTemplate::builder("soldier", "Soldier")
            .health(50)
            .mp(10)
            .attribute(AttributeKind::Strength, 8)
            .attribute(AttributeKind::Fortitude, 8)
            .build();
        Unit::from_template(UnitId(1), Faction::Player, &template)
    }

    #[test]
    fn physical_damage_consults_defense() {
        let mut unit = sample();
        // physical_defense = (8 + 8) / 2 = 8
        let outcome = unit.take_damage(12, DamageType::Physical);
        assert_eq!(outcome.dealt, 4);
        assert_eq!(outcome.hp_after, 46);
        assert!(!outcome.died);
    }

    #[test]
    fn chip_damage_is_at_least_one() {
        let mut unit = sample();
        let outcome = unit.take_damage(2, DamageType::Physical);
        assert_eq!(outcome.dealt, 1);
    }

    #[test]
    fn true_damage_ignores_defense() {
        let mut unit = sample();
        let outcome = unit.take_damage(12, DamageType::True);
        assert_eq!(outcome.dealt, 12);
    }

    #[test]
    fn lethal_damage_flips_alive_once() {
        let mut unit = sample();
        let outcome = unit.take_damage(500, DamageType::True);
        assert!(outcome.died);
        assert!(!unit.alive);

        // Further damage on the corpse reports no second death.
        let outcome = unit.take_damage(10, DamageType::True);
        assert!(!outcome.died);
        assert_eq!(outcome.dealt, 0);
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut unit = sample();
        unit.take_damage(10, DamageType::True);
        assert_eq!(unit.heal(999), 10);
        assert!(unit.resources.hp.is_full());
    }

    #[test]
    fn begin_turn_restores_and_decrements() {
        let mut unit = sample();
        unit.resources.ap.adjust(-5);
        unit.movement_remaining = 0;
        unit.set_cooldown("power_attack", 2);

        unit.begin_turn();
        assert_eq!(unit.resources.ap.current(), unit.effective_attribute(AttributeKind::Speed));
        assert_eq!(unit.movement_remaining, unit.max_movement());
        assert_eq!(unit.cooldown_of("power_attack"), 1);

        unit.begin_turn();
        assert_eq!(unit.cooldown_of("power_attack"), 0);
        assert!(unit.cooldowns.is_empty());
    }

    #[test]
    fn effective_attribute_folds_all_layers() {
        let mut unit = sample();
        unit.equipment.equip(
            crate::units::equipment::EquipmentSlot::Weapon,
            crate::units::equipment::EquippedItem::new("blade", "Blade")
                .with_bonus(AttributeKind::Strength, 3),
        );
        unit.statuses.add_modifier(crate::units::status::AttributeModifier {
            attribute: AttributeKind::Strength,
            delta: 2,
            percent: false,
            turns_remaining: 1,
            source: "war_cry".into(),
        });
        unit.passive_bonuses.insert(AttributeKind::Strength, 1);

        // 8 base + 3 equipment + 2 modifier + 1 passive
        assert_eq!(unit.effective_attribute(AttributeKind::Strength), 14);
    }

    #[test]
    fn percent_modifiers_scale_the_base() {
        let mut unit = sample();
        unit.statuses.add_modifier(crate::units::status::AttributeModifier {
            attribute: AttributeKind::Strength,
            delta: 50,
            percent: true,
            turns_remaining: 1,
            source: "battle_focus".into(),
        });
        // 8 base + 50% of 8 = 12
        assert_eq!(unit.effective_attribute(AttributeKind::Strength), 12);
    }
}
