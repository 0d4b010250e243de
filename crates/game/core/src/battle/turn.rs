//! The turn cycle.
//!
//! Rounds iterate through an initiative-sorted unit list; dead units are
//! skipped without consuming a slot. Each turn runs maintenance, collects
//! intents, resolves the queued timeline, applies end-of-turn effects, and
//! advances. Battle-end is checked after every resolution; a turn cap forces
//! a draw.

use crate::queue::StepOutcome;
use crate::types::{TurnNumber, UnitId};
use crate::units::StatusKind;

use super::phase::{BattleOutcome, BattlePhase, InteractionMode, PhaseError};
use super::{BattleContext, BattleError};

/// HP lost per turn while poisoned.
const POISON_TICK: i32 = 3;
/// HP recovered per turn while regenerating.
const REGEN_TICK: i32 = 3;

/// Mutable turn-cycle state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnState {
    pub phase: BattlePhase,
    pub mode: InteractionMode,
    /// 1-based once the battle starts.
    pub round: TurnNumber,
    /// Initiative order for the current round.
    pub order: Vec<UnitId>,
    /// Index into `order` for the unit currently acting.
    pub cursor: usize,
    pub active_unit: Option<UnitId>,
    pub outcome: Option<BattleOutcome>,
}

/// Emitted when a unit's turn begins.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnStart {
    pub unit: UnitId,
    pub round: TurnNumber,
    /// The unit was stunned entering this turn; its slot should be skipped.
    pub stunned: bool,
}

/// One end-of-turn status tick (poison, regeneration).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndOfTurnTick {
    pub unit: UnitId,
    pub status: StatusKind,
    pub hp_delta: i32,
    pub died: bool,
}

/// Everything that happened when a turn was resolved and ended.
#[derive(Clone, Debug)]
pub struct TurnReport {
    pub ended_unit: UnitId,
    pub round: TurnNumber,
    pub outcomes: Vec<StepOutcome>,
    pub end_of_turn: Vec<EndOfTurnTick>,
    /// Set when this resolution finished the battle.
    pub battle_outcome: Option<BattleOutcome>,
    /// The next turn, when the battle continues.
    pub next: Option<TurnStart>,
}

impl BattleContext {
    // ========================================================================
    // Round & turn flow
    // ========================================================================

    /// Starts the battle: builds the first round's initiative order and opens
    /// the first unit's turn.
    pub fn begin_battle(&mut self) -> Result<TurnStart, BattleError> {
        if self.turn.phase != BattlePhase::Idle {
            return Err(PhaseError {
                from: self.turn.phase,
                to: BattlePhase::SelectingAction,
            }
            .into());
        }
        self.turn.round = 1;
        self.build_round_order();
        let start = self
            .start_turn_at_cursor()
            .ok_or(BattleError::NotStarted)?;
        Ok(start)
    }

    /// Initiative-descending order, ties by unit id, living units only.
    fn build_round_order(&mut self) {
        let mut order: Vec<(i32, UnitId)> = self
            .state
            .living_units()
            .map(|unit| (unit.initiative(), unit.id))
            .collect();
        order.sort_by_key(|&(initiative, id)| (std::cmp::Reverse(initiative), id));
        self.turn.order = order.into_iter().map(|(_, id)| id).collect();
        self.turn.cursor = 0;
    }

    /// Opens the turn of the unit at the cursor, skipping dead entries.
    /// Returns None when the round is exhausted.
    fn start_turn_at_cursor(&mut self) -> Option<TurnStart> {
        while self.turn.cursor < self.turn.order.len() {
            let unit_id = self.turn.order[self.turn.cursor];
            let Some(unit) = self.state.unit_mut(unit_id) else {
                self.turn.cursor += 1;
                continue;
            };
            if !unit.is_alive() {
                self.turn.cursor += 1;
                continue;
            }

            // Stun is sampled before maintenance so a one-turn stun still
            // skips the slot it was inflicted for.
            let stunned = unit.statuses.has(StatusKind::Stunned);
            unit.begin_turn();

            self.turn.active_unit = Some(unit_id);
            self.turn.phase = BattlePhase::SelectingAction;
            self.turn.mode = InteractionMode::None;
            tracing::debug!(%unit_id, round = self.turn.round, stunned, "turn started");
            return Some(TurnStart {
                unit: unit_id,
                round: self.turn.round,
                stunned,
            });
        }
        None
    }

    /// Ends the active unit's turn: resolves the full queued timeline,
    /// executes it, ticks end-of-turn effects, and advances.
    pub fn end_turn(&mut self, unit_id: UnitId) -> Result<TurnReport, BattleError> {
        self.ensure_running()?;
        if self.turn.active_unit != Some(unit_id) {
            return Err(BattleError::NotActiveUnit(unit_id));
        }

        self.transition(BattlePhase::Executing)?;
        self.turn.mode = InteractionMode::None;

        // Resolution: every queued action across all units, in timeline order.
        let initiatives = self.initiative_table();
        self.queue
            .resolve(|id| initiatives.get(&id).copied().unwrap_or(50));
        self.queue.check_consistency()?;
        let outcomes = self.stepper.run_all(
            &mut self.queue,
            &mut self.state,
            &self.registry,
            &self.config,
            &mut self.rng,
        );

        let end_of_turn = self.apply_end_of_turn(unit_id);
        let round = self.turn.round;

        self.transition(BattlePhase::TurnEnd)?;
        let battle_outcome = self.check_battle_end();

        let next = if battle_outcome.is_none() {
            self.advance_turn()
        } else {
            None
        };

        Ok(TurnReport {
            ended_unit: unit_id,
            round,
            outcomes,
            end_of_turn,
            battle_outcome,
            next,
        })
    }

    /// Poison and regeneration tick for the unit whose turn just ended.
    fn apply_end_of_turn(&mut self, unit_id: UnitId) -> Vec<EndOfTurnTick> {
        let mut ticks = Vec::new();
        let Some(unit) = self.state.unit_mut(unit_id) else {
            return ticks;
        };
        if !unit.is_alive() {
            return ticks;
        }

        if unit.statuses.has(StatusKind::Poisoned) {
            let outcome = unit.take_damage(POISON_TICK, crate::effect::DamageType::True);
            ticks.push(EndOfTurnTick {
                unit: unit_id,
                status: StatusKind::Poisoned,
                hp_delta: -outcome.dealt,
                died: outcome.died,
            });
            if outcome.died {
                self.state.remove_from_board(unit_id);
            }
        }

        if let Some(unit) = self.state.unit_mut(unit_id)
            && unit.is_alive()
            && unit.statuses.has(StatusKind::Regenerating)
        {
            let healed = unit.heal(REGEN_TICK);
            if healed > 0 {
                ticks.push(EndOfTurnTick {
                    unit: unit_id,
                    status: StatusKind::Regenerating,
                    hp_delta: healed,
                    died: false,
                });
            }
        }

        ticks
    }

    /// Moves the cursor to the next living unit, rolling into a new round
    /// (and the turn-cap draw) as needed.
    fn advance_turn(&mut self) -> Option<TurnStart> {
        self.turn.cursor += 1;
        loop {
            if let Some(start) = self.start_turn_at_cursor() {
                return Some(start);
            }
            // Round exhausted.
            self.turn.round += 1;
            if self.turn.round > self.config.turn_cap {
                tracing::debug!(cap = self.config.turn_cap, "turn cap reached, drawing");
                self.finish(BattleOutcome::Draw);
                return None;
            }
            self.build_round_order();
            if self.turn.order.is_empty() {
                self.finish(BattleOutcome::Draw);
                return None;
            }
        }
    }

    /// Victory check: when at most one faction still lives, the battle ends.
    pub fn check_battle_end(&mut self) -> Option<BattleOutcome> {
        if self.turn.phase == BattlePhase::BattleOver {
            return self.turn.outcome;
        }
        let factions = self.state.living_factions();
        match factions.len() {
            0 => {
                self.finish(BattleOutcome::Draw);
                self.turn.outcome
            }
            1 => {
                self.finish(BattleOutcome::Victory(factions[0]));
                self.turn.outcome
            }
            _ => None,
        }
    }

    fn finish(&mut self, outcome: BattleOutcome) {
        self.turn.outcome = Some(outcome);
        self.turn.phase = BattlePhase::BattleOver;
        self.turn.active_unit = None;
        self.queue.clear_all();
    }

    // ========================================================================
    // Mode & phase
    // ========================================================================

    /// Enters an interaction mode (Move, Attack, …) during intent collection.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Result<(), BattleError> {
        self.ensure_running()?;
        if !self.turn.phase.accepts_intents() {
            return Err(PhaseError {
                from: self.turn.phase,
                to: BattlePhase::Targeting,
            }
            .into());
        }
        self.turn.mode = mode;
        if mode == InteractionMode::None {
            self.turn.phase = BattlePhase::SelectingAction;
        } else {
            self.turn.phase = BattlePhase::Targeting;
        }
        Ok(())
    }

    /// Escape: back to `None` mode without committing anything.
    pub fn escape_mode(&mut self) -> Result<(), BattleError> {
        self.set_mode(InteractionMode::None)
    }

    pub(crate) fn transition(&mut self, to: BattlePhase) -> Result<(), BattleError> {
        if !self.turn.phase.can_transition(to) {
            return Err(PhaseError {
                from: self.turn.phase,
                to,
            }
            .into());
        }
        self.turn.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionBuilder, ActionKind, ActionRegistry};
    use crate::config::BattleConfig;
    use crate::effect::{DamageType, Effect};
    use crate::grid::Grid;
    use crate::types::{Faction, Position};
    use crate::units::{AttributeKind, StatusInstance, UnitTemplate};

    fn small_registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register(
                ActionBuilder::new("strike", "Strike", ActionKind::Attack)
                    .effect(Effect::Damage {
                        magnitude: 10,
                        damage_type: DamageType::True,
                    })
                    .guaranteed_hit()
                    .no_critical()
                    .build(),
            )
            .unwrap();
        registry.freeze();
        registry
    }

    fn two_unit_battle() -> (BattleContext, UnitId, UnitId) {
        let mut ctx = BattleContext::new(
            BattleConfig::default(),
            small_registry(),
            Grid::open(8, 8),
            7,
        );
        let fast = UnitTemplate::builder("fast", "Fast")
            .attribute(AttributeKind::Speed, 20)
            .health(40)
            .build();
        let slow = UnitTemplate::builder("slow", "Slow")
            .attribute(AttributeKind::Speed, 5)
            .health(40)
            .build();
        let a = ctx.spawn(&fast, Faction::Player, Position::new(1, 1)).unwrap();
        let b = ctx.spawn(&slow, Faction::Enemy, Position::new(2, 1)).unwrap();
        (ctx, a, b)
    }

    #[test]
    fn begin_battle_selects_highest_initiative() {
        let (mut ctx, fast, _) = two_unit_battle();
        let start = ctx.begin_battle().unwrap();
        assert_eq!(start.unit, fast);
        assert_eq!(start.round, 1);
        assert_eq!(ctx.turn.phase, BattlePhase::SelectingAction);
    }

    #[test]
    fn end_turn_rejects_non_active_unit() {
        let (mut ctx, _, slow) = two_unit_battle();
        ctx.begin_battle().unwrap();
        assert!(matches!(
            ctx.end_turn(slow),
            Err(BattleError::NotActiveUnit(_))
        ));
    }

    #[test]
    fn rounds_cycle_through_living_units() {
        let (mut ctx, fast, slow) = two_unit_battle();
        ctx.begin_battle().unwrap();

        let report = ctx.end_turn(fast).unwrap();
        assert_eq!(report.next.as_ref().map(|s| s.unit), Some(slow));

        let report = ctx.end_turn(slow).unwrap();
        // Round 2 begins back at the fast unit.
        assert_eq!(report.next.as_ref().map(|s| s.unit), Some(fast));
        assert_eq!(ctx.turn.round, 2);
    }

    #[test]
    fn queued_strike_resolves_at_turn_end() {
        let (mut ctx, fast, slow) = two_unit_battle();
        ctx.begin_battle().unwrap();

        ctx.queue_action(
            fast,
            "strike",
            vec![crate::action::ActionTarget::Unit(slow)],
            None,
            None,
        )
        .unwrap();
        let report = ctx.end_turn(fast).unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert!(matches!(report.outcomes[0], StepOutcome::Executed { .. }));
        assert_eq!(ctx.unit(slow).unwrap().resources.hp.current(), 30);
    }

    #[test]
    fn killing_the_last_enemy_ends_the_battle() {
        let (mut ctx, fast, slow) = two_unit_battle();
        ctx.begin_battle().unwrap();
        ctx.state
            .unit_mut(slow)
            .unwrap()
            .resources
            .hp
            .set(5);

        ctx.queue_action(
            fast,
            "strike",
            vec![crate::action::ActionTarget::Unit(slow)],
            None,
            None,
        )
        .unwrap();
        let report = ctx.end_turn(fast).unwrap();

        assert_eq!(
            report.battle_outcome,
            Some(BattleOutcome::Victory(Faction::Player))
        );
        assert_eq!(ctx.turn.phase, BattlePhase::BattleOver);
        assert!(ctx.end_turn(fast).is_err());
    }

    #[test]
    fn dead_units_are_skipped_without_consuming_a_slot() {
        let mut ctx = BattleContext::new(
            BattleConfig::default(),
            small_registry(),
            Grid::open(8, 8),
            3,
        );
        let template = UnitTemplate::builder("u", "U").health(20).build();
        let a = ctx.spawn(&template, Faction::Player, Position::new(0, 0)).unwrap();
        let b = ctx.spawn(&template, Faction::Enemy, Position::new(1, 0)).unwrap();
        let c = ctx.spawn(&template, Faction::Player, Position::new(2, 0)).unwrap();

        ctx.begin_battle().unwrap();
        // Kill b outside the normal flow, then finish a's turn: the next
        // turn must belong to c, not to the corpse.
        ctx.state.unit_mut(b).unwrap().take_damage(99, DamageType::True);
        ctx.state.remove_from_board(b);
        // Two factions still "present" but only one alive → battle ends.
        let report = ctx.end_turn(a).unwrap();
        assert_eq!(
            report.battle_outcome,
            Some(BattleOutcome::Victory(Faction::Player))
        );
        let _ = c;
    }

    #[test]
    fn stunned_unit_reports_stun_and_still_refreshes() {
        let (mut ctx, fast, slow) = two_unit_battle();
        ctx.state.unit_mut(slow).unwrap().statuses.add_status(StatusInstance {
            kind: StatusKind::Stunned,
            turns_remaining: 1,
            source: "trap".into(),
        });
        ctx.begin_battle().unwrap();
        let report = ctx.end_turn(fast).unwrap();

        let next = report.next.unwrap();
        assert_eq!(next.unit, slow);
        assert!(next.stunned);
        // Maintenance ran anyway: AP refilled to speed.
        let slow_unit = ctx.unit(slow).unwrap();
        assert_eq!(
            slow_unit.resources.ap.current(),
            slow_unit.effective_attribute(AttributeKind::Speed)
        );
    }

    #[test]
    fn turn_cap_forces_a_draw() {
        let (mut ctx, fast, slow) = two_unit_battle();
        ctx.config.turn_cap = 2;
        ctx.begin_battle().unwrap();

        ctx.end_turn(fast).unwrap();
        ctx.end_turn(slow).unwrap();
        ctx.end_turn(fast).unwrap();
        let report = ctx.end_turn(slow).unwrap();

        assert_eq!(report.battle_outcome, Some(BattleOutcome::Draw));
        assert_eq!(ctx.turn.outcome, Some(BattleOutcome::Draw));
    }

    #[test]
    fn poison_ticks_at_turn_end() {
        let (mut ctx, fast, _) = two_unit_battle();
        ctx.state.unit_mut(fast).unwrap().statuses.add_status(StatusInstance {
            kind: StatusKind::Poisoned,
            turns_remaining: 3,
            source: "venom".into(),
        });
        ctx.begin_battle().unwrap();
        let hp_before = ctx.unit(fast).unwrap().resources.hp.current();
        let report = ctx.end_turn(fast).unwrap();

        assert_eq!(report.end_of_turn.len(), 1);
        assert_eq!(report.end_of_turn[0].hp_delta, -POISON_TICK);
        assert_eq!(
            ctx.unit(fast).unwrap().resources.hp.current(),
            hp_before - POISON_TICK
        );
    }

    #[test]
    fn escape_returns_to_selecting() {
        let (mut ctx, _, _) = two_unit_battle();
        ctx.begin_battle().unwrap();
        ctx.set_mode(InteractionMode::Attack).unwrap();
        assert_eq!(ctx.turn.phase, BattlePhase::Targeting);
        ctx.escape_mode().unwrap();
        assert_eq!(ctx.turn.phase, BattlePhase::SelectingAction);
        assert_eq!(ctx.turn.mode, InteractionMode::None);
    }
}
