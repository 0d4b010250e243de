//! Action manager: the facade between external callers and the combat core.
//!
//! The manager owns the battle context and the event bus. Every mutating
//! operation emits exactly one primary event (plus `unit_died`/`unit_moved`
//! secondaries raised by execution), and the preview cache is invalidated on
//! every execution and turn boundary.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use battle_core::{
    ActionCosts, ActionKind, ActionTarget, BattleContext, BattleError, BattleOutcome, CoreError,
    ExecutionReport, Faction, Grid, Position, Prediction, PriorityClass, SaveState, StepOutcome,
    TargetType, TimelineEntry, TurnReport, TurnStart, UnitId,
};

use crate::error::{Result, RuntimeError};
use crate::events::{BattleEvent, EventBus};
use crate::providers::{Candidate, RecommendContext};

/// UI-facing digest of one available action.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ActionSummary {
    pub id: String,
    pub name: String,
    pub kind: ActionKind,
    pub description: String,
    pub tier: String,
    pub level: u32,
    pub costs: ActionCosts,
    pub cooldown_remaining: u32,
}

type PreviewKey = (UnitId, String, u64);

/// Facade over one battle.
pub struct ActionManager {
    context: BattleContext,
    bus: EventBus,
    /// Terrain layout kept for rebuilding occupancy on load.
    grid_template: Grid,
    preview_cache: HashMap<PreviewKey, ExecutionReport>,
}

impl ActionManager {
    pub fn new(context: BattleContext) -> Self {
        let grid_template = context.state.grid.terrain_only();
        Self {
            context,
            bus: EventBus::new(),
            grid_template,
            preview_cache: HashMap::new(),
        }
    }

    pub fn context(&self) -> &BattleContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut BattleContext {
        &mut self.context
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    // ========================================================================
    // Battle flow
    // ========================================================================

    pub fn begin_battle(&mut self) -> Result<TurnStart> {
        let start = self.context.begin_battle()?;
        self.preview_cache.clear();
        self.bus.publish(BattleEvent::TurnStarted {
            unit: start.unit,
            round: start.round,
            stunned: start.stunned,
        });
        Ok(start)
    }

    /// Ends the active unit's turn, resolving and executing the queued
    /// timeline. Emits one event per executed/skipped action, the turn-end
    /// marker, and whatever the resolution caused (deaths, battle end, the
    /// next turn start).
    pub fn end_turn(&mut self, unit_id: UnitId) -> Result<TurnReport> {
        let report = self.context.end_turn(unit_id)?;
        self.preview_cache.clear();

        for outcome in &report.outcomes {
            match outcome {
                StepOutcome::Executed {
                    report: execution,
                    prediction,
                    ..
                } => {
                    self.publish_execution(execution, prediction.clone());
                }
                StepOutcome::Skipped { queued, cause } => {
                    self.bus.publish(BattleEvent::ActionSkipped {
                        unit: queued.unit_id,
                        action_id: queued.action_id.clone(),
                        cause: cause.clone(),
                    });
                }
                StepOutcome::Idle => {}
            }
        }

        for tick in &report.end_of_turn {
            if tick.died {
                self.bus.publish(BattleEvent::UnitDied { unit: tick.unit });
            }
        }

        self.bus.publish(BattleEvent::TurnEnded {
            unit: report.ended_unit,
            round: report.round,
        });

        if let Some(outcome) = report.battle_outcome {
            self.publish_battle_end(outcome);
        } else if let Some(next) = &report.next {
            self.bus.publish(BattleEvent::TurnStarted {
                unit: next.unit,
                round: next.round,
                stunned: next.stunned,
            });
        }

        Ok(report)
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Validates and queues an action. Failure emits `action_failed` and
    /// nothing else; success emits `action_queued`.
    pub fn queue_action(
        &mut self,
        unit_id: UnitId,
        action_id: &str,
        targets: Vec<ActionTarget>,
        priority: Option<PriorityClass>,
        prediction: Option<Prediction>,
    ) -> Result<u64> {
        let count = targets.len();
        match self
            .context
            .queue_action(unit_id, action_id, targets, priority, prediction)
        {
            Ok(sequence) => {
                let queued = self
                    .context
                    .queue
                    .queued_for(unit_id)
                    .iter()
                    .find(|qa| qa.sequence == sequence)
                    .map(|qa| qa.priority)
                    .unwrap_or_default();
                self.bus.publish(BattleEvent::ActionQueued {
                    unit: unit_id,
                    action_id: action_id.to_string(),
                    sequence,
                    targets: count,
                    priority: queued,
                });
                Ok(sequence)
            }
            Err(error) => {
                self.publish_failure(unit_id, action_id, &error);
                Err(error.into())
            }
        }
    }

    /// Executes an action immediately (cast-time zero path).
    pub fn execute_immediately(
        &mut self,
        unit_id: UnitId,
        action_id: &str,
        targets: &[ActionTarget],
    ) -> Result<ExecutionReport> {
        match self.context.execute_immediately(unit_id, action_id, targets) {
            Ok(report) => {
                self.preview_cache.clear();
                self.publish_execution(&report, None);
                if let Some(outcome) = self.context.check_battle_end() {
                    self.publish_battle_end(outcome);
                }
                Ok(report)
            }
            Err(error) => {
                self.publish_failure(unit_id, action_id, &error);
                Err(error.into())
            }
        }
    }

    /// Cached, side-effect-free preview.
    pub fn preview(
        &mut self,
        unit_id: UnitId,
        action_id: &str,
        targets: &[ActionTarget],
    ) -> Result<ExecutionReport> {
        let key = (unit_id, action_id.to_string(), hash_targets(targets));
        if let Some(cached) = self.preview_cache.get(&key) {
            return Ok(cached.clone());
        }
        let report = self.context.preview(unit_id, action_id, targets)?;
        self.preview_cache.insert(key, report.clone());
        Ok(report)
    }

    /// Actions the unit can start right now, rendered for the UI.
    pub fn available_actions(&self, unit_id: UnitId) -> Result<Vec<ActionSummary>> {
        let unit = self.context.unit(unit_id)?;
        Ok(self
            .context
            .available_actions(unit_id)?
            .into_iter()
            .map(|action| ActionSummary {
                id: action.id.clone(),
                name: action.name.clone(),
                kind: action.kind,
                description: action.description.clone(),
                tier: action.tier.clone(),
                level: action.level,
                costs: action.costs,
                cooldown_remaining: unit.cooldown_of(&action.id),
            })
            .collect())
    }

    pub fn timeline_preview(&mut self) -> Vec<TimelineEntry> {
        self.context.timeline_preview()
    }

    // ========================================================================
    // Queue bookkeeping
    // ========================================================================

    pub fn clear_unit(&mut self, unit_id: UnitId) -> usize {
        let removed = self.context.queue.clear_unit(unit_id);
        self.bus.publish(BattleEvent::QueueCleared {
            unit: Some(unit_id),
            removed,
        });
        removed
    }

    pub fn reorder_unit(&mut self, unit_id: UnitId, new_order: &[usize]) -> bool {
        let reordered = self.context.queue.reorder(unit_id, new_order);
        if reordered {
            self.bus.publish(BattleEvent::QueueReordered { unit: unit_id });
        }
        reordered
    }

    pub fn remove(&mut self, unit_id: UnitId, index: usize) -> bool {
        let removed = self.context.queue.remove(unit_id, index).is_some();
        if removed {
            self.bus.publish(BattleEvent::QueueEntryRemoved {
                unit: unit_id,
                index,
            });
        }
        removed
    }

    // ========================================================================
    // AI support
    // ========================================================================

    /// Builds the snapshot a [`crate::providers::Recommender`] consumes:
    /// every available action previewed against a plausible target.
    ///
    /// Target selection is deliberately simple: the nearest enemy for
    /// offensive policies, the most wounded ally in range for support, the
    /// caster for self-targeted actions. Move-kind actions are left to the
    /// caller's own positioning logic.
    pub fn recommendation_context(&self, unit_id: UnitId) -> Result<RecommendContext> {
        let unit = self.context.unit(unit_id)?;
        let hp_ratio = if unit.resources.hp.max() > 0 {
            unit.resources.hp.current() as f32 / unit.resources.hp.max() as f32
        } else {
            0.0
        };
        let Some(position) = unit.position else {
            return Ok(RecommendContext {
                unit: unit_id,
                hp_ratio,
                candidates: Vec::new(),
            });
        };
        let faction = unit.faction;

        let choices: Vec<(String, ActionKind, TargetType, u32, u32)> = self
            .context
            .available_actions(unit_id)?
            .into_iter()
            .filter(|action| action.kind != ActionKind::Move)
            .map(|action| {
                (
                    action.id.clone(),
                    action.kind,
                    action.targeting.target_type,
                    action.targeting.range,
                    action.targeting.area_of_effect,
                )
            })
            .collect();

        let mut candidates = Vec::new();
        for (action_id, kind, target_type, range, area) in choices {
            let target = match target_type {
                TargetType::SelfOnly => Some(ActionTarget::Unit(unit_id)),
                TargetType::Ally => self.most_wounded_ally(faction, position, range),
                TargetType::Enemy | TargetType::Any => {
                    self.nearest_enemy(faction, position, range).map(ActionTarget::Unit)
                }
                TargetType::Tile | TargetType::Area => {
                    if area > 0 && range == 0 {
                        // Self-centered sweeps target the caster's own tile.
                        Some(ActionTarget::Tile(position))
                    } else {
                        self.nearest_enemy_position(faction, position, range)
                            .map(ActionTarget::Tile)
                    }
                }
            };
            let Some(target) = target else { continue };

            let Ok(report) = self.context.preview(unit_id, &action_id, &[target]) else {
                continue;
            };
            candidates.push(Candidate {
                action_id,
                kind,
                expected_damage: report.damage_total,
                expected_healing: report.healing_total,
                kills: !report.deaths.is_empty(),
                target: Some(target),
            });
        }

        Ok(RecommendContext {
            unit: unit_id,
            hp_ratio,
            candidates,
        })
    }

    fn nearest_enemy(&self, faction: Faction, from: Position, range: u32) -> Option<UnitId> {
        self.context
            .state
            .living_units()
            .filter(|other| other.faction != faction)
            .filter_map(|other| other.position.map(|p| (p.manhattan(from), other.id)))
            .filter(|&(distance, _)| distance <= range)
            .min()
            .map(|(_, id)| id)
    }

    fn nearest_enemy_position(&self, faction: Faction, from: Position, range: u32) -> Option<Position> {
        self.context
            .state
            .living_units()
            .filter(|other| other.faction != faction)
            .filter_map(|other| other.position.map(|p| (p.manhattan(from), p)))
            .filter(|&(distance, _)| distance <= range)
            .min()
            .map(|(_, position)| position)
    }

    fn most_wounded_ally(&self, faction: Faction, from: Position, range: u32) -> Option<ActionTarget> {
        self.context
            .state
            .living_units()
            .filter(|other| other.faction == faction)
            .filter(|other| other.resources.hp.current() < other.resources.hp.max())
            .filter_map(|other| other.position.map(|p| (p.manhattan(from), other)))
            .filter(|&(distance, _)| distance <= range)
            .min_by_key(|&(_, other)| (other.resources.hp.current(), other.id))
            .map(|(_, other)| ActionTarget::Unit(other.id))
    }

    // ========================================================================
    // Save / load
    // ========================================================================

    /// Serializes the battle's mutable state to an opaque JSON blob.
    pub fn save(&self) -> Result<Vec<u8>> {
        let snapshot = SaveState::capture(&self.context);
        serde_json::to_vec(&snapshot).map_err(|error| RuntimeError::BadSaveBlob(error.to_string()))
    }

    /// Replaces the running battle with the one in the blob. Terrain comes
    /// from the grid template captured at construction; queues and caches
    /// restart empty.
    pub fn load(&mut self, blob: &[u8]) -> Result<()> {
        let snapshot: SaveState = serde_json::from_slice(blob)
            .map_err(|error| RuntimeError::BadSaveBlob(error.to_string()))?;
        self.restore_snapshot(snapshot)
    }

    /// Compact binary twin of [`ActionManager::save`] for checkpoint streams.
    pub fn save_compact(&self) -> Result<Vec<u8>> {
        let snapshot = SaveState::capture(&self.context);
        bincode::serialize(&snapshot).map_err(|error| RuntimeError::BadSaveBlob(error.to_string()))
    }

    pub fn load_compact(&mut self, blob: &[u8]) -> Result<()> {
        let snapshot: SaveState = bincode::deserialize(blob)
            .map_err(|error| RuntimeError::BadSaveBlob(error.to_string()))?;
        self.restore_snapshot(snapshot)
    }

    fn restore_snapshot(&mut self, snapshot: SaveState) -> Result<()> {
        let restored = snapshot.restore(
            self.context.config.clone(),
            self.context.registry.clone(),
            self.grid_template.clone(),
        )?;
        self.context = restored;
        self.preview_cache.clear();
        Ok(())
    }

    // ========================================================================
    // Event plumbing
    // ========================================================================

    fn publish_execution(&mut self, report: &ExecutionReport, prediction: Option<battle_core::PredictionScore>) {
        if let Some(movement) = &report.movement {
            self.bus.publish(BattleEvent::UnitMoved {
                unit: report.caster,
                from: movement.from,
                to: movement.to,
            });
        }
        for &dead in &report.deaths {
            self.bus.publish(BattleEvent::UnitDied { unit: dead });
        }
        self.bus.publish(BattleEvent::ActionExecuted {
            report: Box::new(report.clone()),
            prediction,
        });
    }

    fn publish_failure(&mut self, unit_id: UnitId, action_id: &str, error: &BattleError) {
        self.bus.publish(BattleEvent::ActionFailed {
            unit: unit_id,
            action_id: action_id.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        });
    }

    fn publish_battle_end(&mut self, outcome: BattleOutcome) {
        self.bus.publish(BattleEvent::BattleEnded { outcome });
    }
}

fn hash_targets(targets: &[ActionTarget]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    targets.hash(&mut hasher);
    hasher.finish()
}
